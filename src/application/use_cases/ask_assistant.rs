use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::{Classified, ErrorClass};
use crate::application::ports::text_generator::{ChatMessage, TextGenerator};

const SYSTEM_PROMPT: &str = "You are a helpful and concise accounting assistant.";

#[derive(Debug, thiserror::Error)]
pub enum AskAssistantError {
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("Assistant reply failed: {0}")]
    GenerationFailed(String),
}

impl Classified for AskAssistantError {
    fn class(&self) -> ErrorClass {
        match self {
            AskAssistantError::EmptyMessage => ErrorClass::Input,
            AskAssistantError::GenerationFailed(_) => ErrorClass::DependentService,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AskAssistantRequest {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AskAssistantResponse {
    pub reply: String,
}

/// General accounting questions, answered without any stored documents.
pub struct AskAssistantUseCase {
    text_generator: Arc<dyn TextGenerator>,
    call_timeout: Duration,
}

impl AskAssistantUseCase {
    pub fn new(text_generator: Arc<dyn TextGenerator>, call_timeout: Duration) -> Self {
        Self {
            text_generator,
            call_timeout,
        }
    }

    pub async fn execute(
        &self,
        request: AskAssistantRequest,
    ) -> Result<AskAssistantResponse, AskAssistantError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(AskAssistantError::EmptyMessage);
        }

        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(message)];
        let reply = tokio::time::timeout(self.call_timeout, self.text_generator.complete(&messages))
            .await
            .map_err(|_| {
                AskAssistantError::GenerationFailed(format!("timed out after {:?}", self.call_timeout))
            })?
            .map_err(|e| AskAssistantError::GenerationFailed(e.to_string()))?;

        Ok(AskAssistantResponse { reply })
    }
}
