use pgvector::Vector;
use std::sync::Arc;

use crate::application::ports::embedding_provider::{EmbeddingProvider, EmbeddingRequest};

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingServiceError {
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Turns text into vectors of the provider's fixed dimension.
pub struct EmbeddingService {
    embedding_provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingService {
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedding_provider }
    }

    pub async fn embed(&self, text: &str) -> Result<Vector, EmbeddingServiceError> {
        if text.is_empty() {
            return Err(EmbeddingServiceError::ValidationError(
                "Cannot generate embedding for empty text".to_string(),
            ));
        }

        let request = EmbeddingRequest {
            text: text.to_string(),
            model_name: Some(self.embedding_provider.model_info()),
        };

        let response = self
            .embedding_provider
            .generate_embedding(request)
            .await
            .map_err(|e| EmbeddingServiceError::ProviderError(e.to_string()))?;

        self.check_dimension(&response.embedding)?;
        Ok(response.embedding)
    }

    fn check_dimension(&self, embedding: &Vector) -> Result<(), EmbeddingServiceError> {
        let expected = self.embedding_provider.embedding_dimension();
        let actual = embedding.as_slice().len();
        if actual != expected {
            return Err(EmbeddingServiceError::ProviderError(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                expected, actual
            )));
        }
        Ok(())
    }
}
