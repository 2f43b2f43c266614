use serde::{Deserialize, Serialize};

use crate::application::use_cases::ask_assistant::AskAssistantResponse;
use crate::application::use_cases::chat_with_documents::ChatWithDocumentsResponse;
use crate::domain::entities::ScoredChunk;

#[derive(Debug, Deserialize)]
pub struct ChatRequestDto {
    pub question: String,
    pub accountant: String,
    pub client: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ChatSourceDto {
    pub source_filename: String,
    pub chunk_index: i32,
    pub similarity_score: f32,
    pub text: String,
    pub note: Option<String>,
}

impl From<ScoredChunk> for ChatSourceDto {
    fn from(scored: ScoredChunk) -> Self {
        Self {
            source_filename: scored.chunk.source_filename().as_str().to_string(),
            chunk_index: scored.chunk.chunk_index(),
            similarity_score: scored.similarity_score,
            text: scored.chunk.sequence_text().to_string(),
            note: scored.chunk.note().map(|n| n.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponseDto {
    pub answer: String,
    pub sources: Vec<ChatSourceDto>,
}

impl From<ChatWithDocumentsResponse> for ChatResponseDto {
    fn from(response: ChatWithDocumentsResponse) -> Self {
        Self {
            answer: response.answer,
            sources: response.sources.into_iter().map(ChatSourceDto::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssistantRequestDto {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AssistantResponseDto {
    pub reply: String,
}

impl From<AskAssistantResponse> for AssistantResponseDto {
    fn from(response: AskAssistantResponse) -> Self {
        Self {
            reply: response.reply,
        }
    }
}
