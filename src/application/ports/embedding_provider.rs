use async_trait::async_trait;
use pgvector::Vector;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingProviderError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("Service unavailable")]
    ServiceUnavailable,
}

#[derive(Debug, Clone)]
pub struct EmbeddingRequest {
    pub text: String,
    pub model_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    pub embedding: Vector,
    pub model_name: String,
    pub token_count: Option<i32>,
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn generate_embedding(
        &self,
        request: EmbeddingRequest,
    ) -> Result<EmbeddingResponse, EmbeddingProviderError>;

    fn model_info(&self) -> String;

    fn embedding_dimension(&self) -> usize;
}
