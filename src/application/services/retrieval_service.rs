use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::{Classified, ErrorClass};
use crate::application::services::embedding_service::{EmbeddingService, EmbeddingServiceError};
use crate::domain::entities::RetrievalResult;
use crate::domain::repositories::ChunkSink;
use crate::domain::value_objects::Tenant;

pub const DEFAULT_TOP_K: usize = 10;
pub const MAX_TOP_K: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Query embedding failed: {0}")]
    EmbeddingError(String),
    #[error("Similarity search failed: {0}")]
    SearchError(String),
}

impl Classified for RetrievalError {
    fn class(&self) -> ErrorClass {
        match self {
            RetrievalError::InvalidQuery(_) => ErrorClass::Input,
            RetrievalError::EmbeddingError(_) | RetrievalError::SearchError(_) => {
                ErrorClass::DependentService
            }
        }
    }
}

/// Finds the chunks of one tenant that are closest to a question.
pub struct RetrievalService {
    embedding_service: Arc<EmbeddingService>,
    chunk_sink: Arc<dyn ChunkSink>,
    call_timeout: Duration,
    embedding_timeout: Duration,
}

impl RetrievalService {
    pub fn new(
        embedding_service: Arc<EmbeddingService>,
        chunk_sink: Arc<dyn ChunkSink>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            embedding_service,
            chunk_sink,
            call_timeout,
            embedding_timeout: call_timeout,
        }
    }

    /// Bound on embedding the query. Defaults to the search timeout.
    pub fn with_embedding_timeout(mut self, embedding_timeout: Duration) -> Self {
        self.embedding_timeout = embedding_timeout;
        self
    }

    pub async fn retrieve(
        &self,
        query: &str,
        tenant: &Tenant,
        k: usize,
    ) -> Result<RetrievalResult, RetrievalError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "Query cannot be empty".to_string(),
            ));
        }
        if !(1..=MAX_TOP_K).contains(&k) {
            return Err(RetrievalError::InvalidQuery(format!(
                "Result limit must be between 1 and {}, got {}",
                MAX_TOP_K, k
            )));
        }

        let query_vector =
            match tokio::time::timeout(self.embedding_timeout, self.embedding_service.embed(query))
                .await
            {
                Ok(Ok(vector)) => vector,
                Ok(Err(EmbeddingServiceError::ValidationError(msg))) => {
                    return Err(RetrievalError::InvalidQuery(msg));
                }
                Ok(Err(e)) => return Err(RetrievalError::EmbeddingError(e.to_string())),
                Err(_) => {
                    return Err(RetrievalError::EmbeddingError(format!(
                        "timed out after {}s",
                        self.embedding_timeout.as_secs()
                    )));
                }
            };

        let candidates = tokio::time::timeout(
            self.call_timeout,
            self.chunk_sink.similarity_search(tenant, &query_vector, k),
        )
        .await
        .map_err(|_| {
            RetrievalError::SearchError(format!(
                "timed out after {}s",
                self.call_timeout.as_secs()
            ))
        })?
        .map_err(|e| RetrievalError::SearchError(e.to_string()))?;

        let (result, dropped) = RetrievalResult::for_tenant(tenant.clone(), candidates, k);
        if dropped > 0 {
            tracing::warn!(
                "Dropped {} similarity rows outside tenant {} from the {} sink",
                dropped,
                tenant,
                self.chunk_sink.kind()
            );
        }

        tracing::debug!("Retrieved {} chunks for {}", result.len(), tenant);
        Ok(result)
    }
}
