use async_trait::async_trait;
use pgvector::Vector;
use reqwest::{Client, Error as ReqwestError, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::embedding_provider::{
    EmbeddingProvider, EmbeddingProviderError, EmbeddingRequest, EmbeddingResponse,
};

pub const DEFAULT_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

#[derive(Serialize)]
pub struct EmbeddingsRequest<'a> {
    pub input: &'a str,
    pub model: &'a str,
}

#[derive(Deserialize)]
pub struct EmbeddingsResponse {
    pub data: Vec<EmbeddingData>,
    pub model: Option<String>,
    pub usage: Option<EmbeddingsUsage>,
}

#[derive(Deserialize)]
pub struct EmbeddingData {
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Deserialize)]
pub struct EmbeddingsUsage {
    pub total_tokens: i32,
}

/// Retry schedule shared by the HTTP clients: `max_retries` extra attempts,
/// waiting `backoff_factor^(attempt-1)` seconds between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 1.5,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis((self.backoff_factor.powi(attempt as i32 - 1) * 1000.0) as u64)
    }

    /// Worst-case wall time of one call: every attempt hitting `per_attempt`
    /// plus every backoff wait in between.
    pub fn budget(&self, per_attempt: Duration) -> Duration {
        let waits: Duration = (1..=self.max_retries).map(|attempt| self.backoff(attempt)).sum();
        per_attempt * (self.max_retries + 1) + waits
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingsClientConfig {
    pub service_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for EmbeddingsClientConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_EMBEDDINGS_URL.to_string(),
            api_key: None,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            timeout_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

impl EmbeddingsClientConfig {
    pub fn call_budget(&self) -> Duration {
        self.retry.budget(Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingsError {
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Rejected with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl EmbeddingsError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingsError::RequestError(_) => true,
            EmbeddingsError::Rejected { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            EmbeddingsError::ParseError(_) => false,
        }
    }
}

impl From<EmbeddingsError> for EmbeddingProviderError {
    fn from(error: EmbeddingsError) -> Self {
        match error {
            EmbeddingsError::RequestError(msg) => EmbeddingProviderError::NetworkError(msg),
            EmbeddingsError::Rejected { status, .. } if status == StatusCode::TOO_MANY_REQUESTS => {
                EmbeddingProviderError::RateLimitExceeded
            }
            EmbeddingsError::Rejected { status, .. } if status.is_server_error() => {
                EmbeddingProviderError::ServiceUnavailable
            }
            EmbeddingsError::Rejected { status, body } => {
                EmbeddingProviderError::ApiError(format!("{}: {}", status, body))
            }
            EmbeddingsError::ParseError(msg) => EmbeddingProviderError::ApiError(msg),
        }
    }
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: Client,
    config: EmbeddingsClientConfig,
}

impl InferenceClient {
    pub fn new(config: EmbeddingsClientConfig) -> Result<Self, ReqwestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EmbeddingsClientConfig {
        &self.config
    }

    pub async fn get_embedding(&self, text: &str) -> Result<EmbeddingsResponse, EmbeddingsError> {
        let request = EmbeddingsRequest {
            input: text,
            model: &self.config.model,
        };
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.execute_request(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempts <= self.config.retry.max_retries => {
                    let backoff_time = self.config.retry.backoff(attempts);
                    tracing::warn!(
                        "Embedding request attempt {} failed ({}), retrying in {:?}",
                        attempts,
                        e,
                        backoff_time
                    );
                    tokio::time::sleep(backoff_time).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute_request(
        &self,
        request: &EmbeddingsRequest<'_>,
    ) -> Result<EmbeddingsResponse, EmbeddingsError> {
        let mut builder = self
            .client
            .post(&self.config.service_url)
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EmbeddingsError::RequestError(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingsError::Rejected { status, body });
        }

        let mut parsed = response
            .json::<EmbeddingsResponse>()
            .await
            .map_err(|e| EmbeddingsError::ParseError(e.to_string()))?;
        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed)
    }
}

// Adapter to implement the EmbeddingProvider trait
pub struct InferenceEmbeddingProvider {
    client: InferenceClient,
}

impl InferenceEmbeddingProvider {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EmbeddingProvider for InferenceEmbeddingProvider {
    async fn generate_embedding(
        &self,
        request: EmbeddingRequest,
    ) -> Result<EmbeddingResponse, EmbeddingProviderError> {
        if request.text.is_empty() {
            return Err(EmbeddingProviderError::InvalidInput(
                "Text cannot be empty".to_string(),
            ));
        }

        let response = self.client.get_embedding(&request.text).await?;
        let model_name = response
            .model
            .clone()
            .unwrap_or_else(|| self.client.config().model.clone());
        let token_count = response.usage.as_ref().map(|u| u.total_tokens);

        let first = response.data.into_iter().next().ok_or_else(|| {
            EmbeddingProviderError::ApiError("No embeddings returned".to_string())
        })?;

        Ok(EmbeddingResponse {
            embedding: Vector::from(first.embedding),
            model_name,
            token_count,
        })
    }

    fn model_info(&self) -> String {
        self.client.config().model.clone()
    }

    fn embedding_dimension(&self) -> usize {
        self.client.config().dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_openai_shape() {
        let request = EmbeddingsRequest {
            input: "Hello World",
            model: "text-embedding-3-small",
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "text-embedding-3-small");
        assert_eq!(json["input"], "Hello World");
    }

    #[test]
    fn test_response_parses_data_items() {
        let body = r#"{
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.3, 0.4]},
                {"object": "embedding", "index": 0, "embedding": [0.1, 0.2]}
            ],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 4, "total_tokens": 4}
        }"#;

        let response: EmbeddingsResponse = serde_json::from_str(body).unwrap();

        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[0].index, 1);
        assert_eq!(response.usage.unwrap().total_tokens, 4);
    }

    #[test]
    fn test_only_transient_failures_are_retried() {
        let rate_limited = EmbeddingsError::Rejected {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        let bad_request = EmbeddingsError::Rejected {
            status: StatusCode::BAD_REQUEST,
            body: String::new(),
        };

        assert!(rate_limited.is_retryable());
        assert!(EmbeddingsError::RequestError("reset".to_string()).is_retryable());
        assert!(!bad_request.is_retryable());
        assert!(matches!(
            EmbeddingProviderError::from(rate_limited),
            EmbeddingProviderError::RateLimitExceeded
        ));
    }

    #[test]
    fn test_backoff_grows_with_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(1500));
    }

    #[test]
    fn test_budget_covers_every_attempt_and_wait() {
        let config = EmbeddingsClientConfig::default();

        assert_eq!(config.call_budget(), Duration::from_millis(4 * 30_000 + 1000 + 1500 + 2250));

        let no_retries = RetryPolicy {
            max_retries: 0,
            backoff_factor: 2.0,
        };
        assert_eq!(no_retries.budget(Duration::from_secs(5)), Duration::from_secs(5));
    }
}
