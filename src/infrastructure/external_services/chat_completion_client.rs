use async_trait::async_trait;
use reqwest::{Client, Error as ReqwestError, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::inference_client::RetryPolicy;
use crate::application::ports::text_generator::{ChatMessage, TextGenerationError, TextGenerator};

pub const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    pub service_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for ChatCompletionConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_CHAT_COMPLETIONS_URL.to_string(),
            api_key: None,
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.3,
            timeout_secs: 60,
            retry: RetryPolicy::default(),
        }
    }
}

impl ChatCompletionConfig {
    pub fn call_budget(&self) -> Duration {
        self.retry.budget(Duration::from_secs(self.timeout_secs))
    }
}

/// [`TextGenerator`] backed by an OpenAI-compatible chat completions endpoint.
pub struct ChatCompletionClient {
    client: Client,
    config: ChatCompletionConfig,
}

impl ChatCompletionClient {
    pub fn new(config: ChatCompletionConfig) -> Result<Self, ReqwestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    async fn execute_request(
        &self,
        messages: &[ChatMessage],
    ) -> Result<CompletionResponse, (bool, TextGenerationError)> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
        };

        let mut builder = self.client.post(&self.config.service_url).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|e| {
            (
                true,
                TextGenerationError::NetworkError(e.without_url().to_string()),
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            return Err((
                retryable,
                TextGenerationError::ApiError(format!("{}: {}", status, body)),
            ));
        }

        response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| (false, TextGenerationError::ApiError(e.to_string())))
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, TextGenerationError> {
        let mut attempts = 0;

        let response = loop {
            attempts += 1;

            match self.execute_request(messages).await {
                Ok(response) => break response,
                Err((true, e)) if attempts <= self.config.retry.max_retries => {
                    let backoff_time = self.config.retry.backoff(attempts);
                    tracing::warn!(
                        "Chat completion attempt {} failed ({}), retrying in {:?}",
                        attempts,
                        e,
                        backoff_time
                    );
                    tokio::time::sleep(backoff_time).await;
                }
                Err((_, e)) => return Err(e),
            }
        };

        first_content(response)
    }
}

fn first_content(response: CompletionResponse) -> Result<String, TextGenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(TextGenerationError::EmptyCompletion)
}
