use std::sync::Arc;

use crate::application::errors::{Classified, ErrorClass};
use crate::application::services::answer_composer::AnswerError;
use crate::application::services::retrieval_service::{DEFAULT_TOP_K, RetrievalError};
use crate::application::services::{AnswerComposer, RetrievalService};
use crate::domain::entities::ScoredChunk;
use crate::domain::value_objects::{Tenant, TenantError};

#[derive(Debug, thiserror::Error)]
pub enum ChatWithDocumentsError {
    #[error(transparent)]
    InvalidTenant(#[from] TenantError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
}

impl Classified for ChatWithDocumentsError {
    fn class(&self) -> ErrorClass {
        match self {
            ChatWithDocumentsError::InvalidTenant(_) => ErrorClass::Input,
            ChatWithDocumentsError::Retrieval(e) => e.class(),
            ChatWithDocumentsError::Answer(e) => e.class(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatWithDocumentsRequest {
    pub question: String,
    pub accountant: String,
    pub client: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ChatWithDocumentsResponse {
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
}

pub struct ChatWithDocumentsUseCase {
    retrieval_service: Arc<RetrievalService>,
    answer_composer: Arc<AnswerComposer>,
}

impl ChatWithDocumentsUseCase {
    pub fn new(retrieval_service: Arc<RetrievalService>, answer_composer: Arc<AnswerComposer>) -> Self {
        Self {
            retrieval_service,
            answer_composer,
        }
    }

    pub async fn execute(
        &self,
        request: ChatWithDocumentsRequest,
    ) -> Result<ChatWithDocumentsResponse, ChatWithDocumentsError> {
        let tenant = Tenant::new(&request.accountant, &request.client)?;
        let limit = request.limit.unwrap_or(DEFAULT_TOP_K);

        let retrieval = self
            .retrieval_service
            .retrieve(&request.question, &tenant, limit)
            .await?;
        let composed = self
            .answer_composer
            .compose(&request.question, &retrieval)
            .await?;

        Ok(ChatWithDocumentsResponse {
            answer: composed.answer,
            sources: composed.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::ingestion_pipeline::IngestionRequest;
    use crate::application::services::{EmbeddingService, IngestionPipeline};
    use crate::domain::repositories::SinkKind;
    use crate::infrastructure::memory::InMemoryChunkSink;
    use crate::test_support::{
        FakeEmbeddingProvider, FakeTextGenerator, MemoryBlobStore, StaticExtractor,
    };
    use std::time::Duration;

    #[tokio::test]
    async fn test_answers_are_grounded_in_the_callers_documents_only() {
        let embeddings = Arc::new(EmbeddingService::new(Arc::new(FakeEmbeddingProvider::new(32))));
        let report_sink = Arc::new(InMemoryChunkSink::new(SinkKind::Report));
        let chat_sink = Arc::new(InMemoryChunkSink::new(SinkKind::Chat));
        let generator = Arc::new(FakeTextGenerator::replying("Your VAT is due in May."));

        for (client, text) in [("acme", "acme vat return"), ("globex", "globex payroll")] {
            let pipeline = IngestionPipeline::new(
                Arc::new(MemoryBlobStore::new()),
                Arc::new(StaticExtractor::with_text(text)),
                embeddings.clone(),
                report_sink.clone(),
                chat_sink.clone(),
            );
            pipeline
                .ingest(IngestionRequest {
                    data: b"bytes".to_vec(),
                    media_type: "application/pdf".to_string(),
                    tenant: Tenant::new("acc1", client).unwrap(),
                    original_filename: format!("{client}.pdf"),
                    user_note: None,
                })
                .await
                .unwrap();
        }

        let use_case = ChatWithDocumentsUseCase::new(
            Arc::new(RetrievalService::new(
                embeddings,
                chat_sink,
                Duration::from_secs(1),
            )),
            Arc::new(AnswerComposer::new(generator.clone(), Duration::from_secs(1))),
        );

        let response = use_case
            .execute(ChatWithDocumentsRequest {
                question: "globex payroll".to_string(),
                accountant: "acc1".to_string(),
                client: "acme".to_string(),
                limit: None,
            })
            .await
            .unwrap();

        assert_eq!(response.answer, "Your VAT is due in May.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].chunk.tenant().client(), "acme");
        let prompt = &generator.requests()[0][1].content;
        let (context, _question) = prompt.split_once("Question:").unwrap();
        assert!(context.contains("acme vat return"));
        assert!(!context.contains("globex"));
    }

    #[tokio::test]
    async fn test_missing_client_is_an_input_error() {
        let embeddings = Arc::new(EmbeddingService::new(Arc::new(FakeEmbeddingProvider::new(8))));
        let use_case = ChatWithDocumentsUseCase::new(
            Arc::new(RetrievalService::new(
                embeddings,
                Arc::new(InMemoryChunkSink::new(SinkKind::Chat)),
                Duration::from_secs(1),
            )),
            Arc::new(AnswerComposer::new(
                Arc::new(FakeTextGenerator::replying("unused")),
                Duration::from_secs(1),
            )),
        );

        let error = use_case
            .execute(ChatWithDocumentsRequest {
                question: "anything".to_string(),
                accountant: "acc1".to_string(),
                client: " ".to_string(),
                limit: Some(5),
            })
            .await
            .unwrap_err();

        assert_eq!(error.class(), ErrorClass::Input);
    }
}
