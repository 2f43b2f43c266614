use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::{Classified, ErrorClass};
use crate::application::ports::text_generator::{ChatMessage, TextGenerator};
use crate::domain::entities::{RetrievalResult, ScoredChunk};

pub const CONTEXT_SEPARATOR: &str = "\n---\n";
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 12_000;

const SYSTEM_PROMPT: &str = "You are a helpful Cyprus tax assistant.";

#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("Invalid question: {0}")]
    InvalidQuestion(String),
    #[error("Answer generation failed: {0}")]
    GenerationFailed(String),
}

impl Classified for AnswerError {
    fn class(&self) -> ErrorClass {
        match self {
            AnswerError::InvalidQuestion(_) => ErrorClass::Input,
            AnswerError::GenerationFailed(_) => ErrorClass::DependentService,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComposedAnswer {
    pub answer: String,
    /// Exactly the chunks whose text went into the prompt, in prompt order.
    pub sources: Vec<ScoredChunk>,
}

/// Context text built from ranked chunks plus how many of them it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    pub text: String,
    pub chunks_used: usize,
}

/// Joins chunk texts with [`CONTEXT_SEPARATOR`] until the next one would push
/// the context past `max_chars`. A first chunk that is longer than the cap on
/// its own is cut at a character boundary.
pub fn assemble_context(matches: &[ScoredChunk], max_chars: usize) -> AssembledContext {
    let separator_chars = CONTEXT_SEPARATOR.chars().count();
    let mut text = String::new();
    let mut length = 0;
    let mut chunks_used = 0;

    for scored in matches {
        let chunk_text = scored.chunk.sequence_text();
        let chunk_chars = chunk_text.chars().count();

        if chunks_used == 0 {
            if chunk_chars > max_chars {
                text.extend(chunk_text.chars().take(max_chars));
                chunks_used = if max_chars > 0 { 1 } else { 0 };
                break;
            }
            text.push_str(chunk_text);
            length = chunk_chars;
        } else {
            if length + separator_chars + chunk_chars > max_chars {
                break;
            }
            text.push_str(CONTEXT_SEPARATOR);
            text.push_str(chunk_text);
            length += separator_chars + chunk_chars;
        }
        chunks_used += 1;
    }

    AssembledContext { text, chunks_used }
}

/// Turns retrieved chunks into a grounded answer.
pub struct AnswerComposer {
    text_generator: Arc<dyn TextGenerator>,
    max_context_chars: usize,
    call_timeout: Duration,
}

impl AnswerComposer {
    pub fn new(text_generator: Arc<dyn TextGenerator>, call_timeout: Duration) -> Self {
        Self {
            text_generator,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            call_timeout,
        }
    }

    pub fn with_max_context_chars(mut self, max_context_chars: usize) -> Self {
        self.max_context_chars = max_context_chars;
        self
    }

    pub async fn compose(
        &self,
        query: &str,
        retrieval: &RetrievalResult,
    ) -> Result<ComposedAnswer, AnswerError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AnswerError::InvalidQuestion(
                "Question cannot be empty".to_string(),
            ));
        }

        let context = assemble_context(retrieval.matches(), self.max_context_chars);
        if context.chunks_used < retrieval.len() {
            tracing::debug!(
                "Context cap of {} chars reached, using {} of {} chunks",
                self.max_context_chars,
                context.chunks_used,
                retrieval.len()
            );
        }

        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "You are a Cyprus-based accounting assistant.\n\nUse the following context to answer the question.\n\nContext:\n{}\n\nQuestion: {}\nAnswer:",
                context.text, query
            )),
        ];

        let answer = tokio::time::timeout(self.call_timeout, self.text_generator.complete(&messages))
            .await
            .map_err(|_| {
                AnswerError::GenerationFailed(format!(
                    "timed out after {}s",
                    self.call_timeout.as_secs()
                ))
            })?
            .map_err(|e| AnswerError::GenerationFailed(e.to_string()))?;

        let sources = retrieval.matches()[..context.chunks_used].to_vec();
        Ok(ComposedAnswer { answer, sources })
    }
}
