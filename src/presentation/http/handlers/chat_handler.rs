use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use crate::application::use_cases::{
    AskAssistantUseCase, ChatWithDocumentsUseCase, ask_assistant::AskAssistantRequest,
    chat_with_documents::ChatWithDocumentsRequest,
};
use crate::presentation::http::dto::{
    ApiResponse, AssistantRequestDto, AssistantResponseDto, ChatRequestDto, ChatResponseDto,
};

pub struct ChatHandler {
    chat_use_case: Arc<ChatWithDocumentsUseCase>,
    assistant_use_case: Arc<AskAssistantUseCase>,
    expose_error_details: bool,
}

impl ChatHandler {
    pub fn new(
        chat_use_case: Arc<ChatWithDocumentsUseCase>,
        assistant_use_case: Arc<AskAssistantUseCase>,
        expose_error_details: bool,
    ) -> Self {
        Self {
            chat_use_case,
            assistant_use_case,
            expose_error_details,
        }
    }

    pub async fn ask_assistant(
        State(handler): State<Arc<ChatHandler>>,
        Json(request): Json<AssistantRequestDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = AskAssistantRequest {
            message: request.message,
        };

        match handler.assistant_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(AssistantResponseDto::from(response))),
            )),
            Err(e) => Ok(ApiResponse::from_error(&e, handler.expose_error_details)),
        }
    }

    pub async fn chat_with_documents(
        State(handler): State<Arc<ChatHandler>>,
        Json(request): Json<ChatRequestDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = ChatWithDocumentsRequest {
            question: request.question,
            accountant: request.accountant,
            client: request.client,
            limit: request.limit,
        };

        match handler.chat_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(ChatResponseDto::from(response))),
            )),
            Err(e) => Ok(ApiResponse::from_error(&e, handler.expose_error_details)),
        }
    }
}
