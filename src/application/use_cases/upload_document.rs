use std::sync::Arc;

use crate::application::errors::{Classified, ErrorClass};
use crate::application::ports::document_extractor::ExtractionMethod;
use crate::application::services::ingestion_pipeline::{IngestionError, IngestionRequest};
use crate::application::services::{DocumentCatalog, IngestionPipeline};
use crate::domain::entities::UploadRecord;
use crate::domain::value_objects::{Category, Tenant, TenantError};

#[derive(Debug, thiserror::Error)]
pub enum UploadDocumentError {
    #[error(transparent)]
    InvalidTenant(#[from] TenantError),
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
}

impl Classified for UploadDocumentError {
    fn class(&self) -> ErrorClass {
        match self {
            UploadDocumentError::InvalidTenant(_) => ErrorClass::Input,
            UploadDocumentError::Ingestion(e) => e.class(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadDocumentRequest {
    pub accountant: String,
    pub client: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub file_data: Vec<u8>,
    pub document_type: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadDocumentResponse {
    pub storage_key: String,
    pub source_filename: String,
    pub chunk_count: usize,
    pub extraction_method: ExtractionMethod,
    pub note: Option<String>,
    pub suggested_category: Category,
    pub record: UploadRecord,
}

/// Ingests one upload, then keeps its [`UploadRecord`] for the catalog.
pub struct UploadDocumentUseCase {
    ingestion_pipeline: Arc<IngestionPipeline>,
    document_catalog: Arc<DocumentCatalog>,
}

impl UploadDocumentUseCase {
    pub fn new(
        ingestion_pipeline: Arc<IngestionPipeline>,
        document_catalog: Arc<DocumentCatalog>,
    ) -> Self {
        Self {
            ingestion_pipeline,
            document_catalog,
        }
    }

    pub async fn execute(
        &self,
        request: UploadDocumentRequest,
    ) -> Result<UploadDocumentResponse, UploadDocumentError> {
        let tenant = Tenant::new(&request.accountant, &request.client)?;
        let media_type = request
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let outcome = self
            .ingestion_pipeline
            .ingest(IngestionRequest {
                data: request.file_data,
                media_type,
                tenant: tenant.clone(),
                original_filename: request.file_name.clone(),
                user_note: request.note.clone(),
            })
            .await?;

        let record = UploadRecord::new(
            &tenant,
            &outcome.source_filename,
            &request.file_name,
            request.document_type.as_deref(),
            request.note.as_deref(),
        )
        .with_insights(outcome.summary.as_deref(), outcome.suggested_category);

        // Blob and chunks are committed by now; a lost record only hides metadata.
        if let Err(e) = self
            .document_catalog
            .record(&outcome.storage_key, &record)
            .await
        {
            tracing::warn!("Failed to store upload record for {}: {}", outcome.storage_key, e);
        }

        Ok(UploadDocumentResponse {
            storage_key: outcome.storage_key.to_string(),
            source_filename: outcome.source_filename.to_string(),
            chunk_count: outcome.chunk_count,
            extraction_method: outcome.extraction_method,
            note: outcome.note,
            suggested_category: outcome.suggested_category,
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::EmbeddingService;
    use crate::domain::repositories::SinkKind;
    use crate::infrastructure::memory::InMemoryChunkSink;
    use crate::test_support::{FakeEmbeddingProvider, MemoryBlobStore, StaticExtractor};

    fn use_case(store: Arc<MemoryBlobStore>) -> UploadDocumentUseCase {
        let pipeline = IngestionPipeline::new(
            store.clone(),
            Arc::new(StaticExtractor::with_text("Rent received for March.")),
            Arc::new(EmbeddingService::new(Arc::new(FakeEmbeddingProvider::new(8)))),
            Arc::new(InMemoryChunkSink::new(SinkKind::Report)),
            Arc::new(InMemoryChunkSink::new(SinkKind::Chat)),
        );
        UploadDocumentUseCase::new(Arc::new(pipeline), Arc::new(DocumentCatalog::new(store)))
    }

    fn request() -> UploadDocumentRequest {
        UploadDocumentRequest {
            accountant: "acc1".to_string(),
            client: "acme".to_string(),
            file_name: "rent.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            file_data: b"Rent received for March.".to_vec(),
            document_type: Some("income".to_string()),
            note: Some("March rent".to_string()),
        }
    }

    #[tokio::test]
    async fn test_upload_keeps_a_record_for_the_catalog() {
        let store = Arc::new(MemoryBlobStore::new());
        let uploads = use_case(store.clone());

        let response = uploads.execute(request()).await.unwrap();

        assert_eq!(response.record.original_name, "rent.txt");
        assert_eq!(response.record.document_type, "income");
        assert_eq!(response.record.notes, "March rent");
        assert!(!response.record.is_reviewed);

        let listed = DocumentCatalog::new(store).list("acc1", None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, response.storage_key);
        assert_eq!(listed[0].record.as_ref(), Some(&response.record));
    }

    #[tokio::test]
    async fn test_invalid_tenant_is_an_input_error() {
        let uploads = use_case(Arc::new(MemoryBlobStore::new()));
        let mut bad = request();
        bad.client = "../x".to_string();

        let error = uploads.execute(bad).await.unwrap_err();

        assert_eq!(error.class(), ErrorClass::Input);
    }
}
