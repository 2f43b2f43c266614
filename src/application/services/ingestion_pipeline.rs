use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::errors::{Classified, ErrorClass};
use crate::application::ports::document_extractor::{ExtractionMethod, essence};
use crate::application::ports::{BlobStore, DocumentExtractor};
use crate::application::services::chunker::Chunker;
use crate::application::services::document_enricher::{DocumentEnricher, DocumentInsights};
use crate::application::services::embedding_service::EmbeddingService;
use crate::domain::entities::DocumentChunk;
use crate::domain::repositories::chunk_sink::{ChunkSink, SinkKind};
use crate::domain::value_objects::{Category, MonotonicMillis, SourceFilename, StorageKey, Tenant};

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Failed to store upload {storage_key}: {message}")]
    BlobStore {
        storage_key: String,
        message: String,
    },
    #[error("Failed to extract text from {source_filename}: {message}")]
    Extraction {
        source_filename: String,
        message: String,
    },
    #[error("Embedding failed for chunk {chunk_index} of {source_filename}: {message}")]
    Embedding {
        source_filename: String,
        chunk_index: usize,
        chunks_written: usize,
        message: String,
    },
    #[error("Writing chunk {chunk_index} of {source_filename} to the {sink} sink failed: {message}")]
    SinkWrite {
        source_filename: String,
        chunk_index: usize,
        sink: SinkKind,
        chunks_written: usize,
        message: String,
    },
    #[error("Ingestion of {source_filename} cancelled after {chunks_written} chunks")]
    Cancelled {
        source_filename: String,
        chunks_written: usize,
    },
}

impl IngestionError {
    /// Chunks committed to both sinks before the failure.
    pub fn chunks_written(&self) -> usize {
        match self {
            IngestionError::Embedding { chunks_written, .. }
            | IngestionError::SinkWrite { chunks_written, .. }
            | IngestionError::Cancelled { chunks_written, .. } => *chunks_written,
            _ => 0,
        }
    }
}

impl Classified for IngestionError {
    fn class(&self) -> ErrorClass {
        match self {
            IngestionError::InvalidInput(_) => ErrorClass::Input,
            IngestionError::Extraction { .. } => ErrorClass::Extraction,
            IngestionError::BlobStore { .. }
            | IngestionError::Embedding { .. }
            | IngestionError::SinkWrite { .. }
            | IngestionError::Cancelled { .. } => ErrorClass::DependentService,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionSettings {
    pub max_upload_bytes: usize,
    pub enrich_documents: bool,
    /// Bound on every blob and sink call.
    pub call_timeout: Duration,
    /// Bound on one chunk embedding, retries included.
    pub embedding_timeout: Duration,
    /// Bound on text extraction, which may include OCR of every page.
    pub extraction_timeout: Duration,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: 25 * 1024 * 1024,
            enrich_documents: true,
            call_timeout: Duration::from_secs(30),
            embedding_timeout: Duration::from_secs(120),
            extraction_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionRequest {
    pub data: Vec<u8>,
    pub media_type: String,
    pub tenant: Tenant,
    pub original_filename: String,
    pub user_note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IngestionOutcome {
    pub source_filename: SourceFilename,
    pub storage_key: StorageKey,
    pub chunk_count: usize,
    pub extraction_method: ExtractionMethod,
    pub note: Option<String>,
    pub summary: Option<String>,
    pub suggested_category: Category,
}

enum CallFailure<E> {
    Failed(E),
    TimedOut(Duration),
    Cancelled,
}

impl<E: std::fmt::Display> CallFailure<E> {
    fn message(&self) -> String {
        match self {
            CallFailure::Failed(e) => e.to_string(),
            CallFailure::TimedOut(limit) => format!("timed out after {}s", limit.as_secs()),
            CallFailure::Cancelled => "cancelled".to_string(),
        }
    }
}

async fn bounded<T, E, F>(
    cancel: &CancellationToken,
    limit: Duration,
    call: F,
) -> Result<T, CallFailure<E>>
where
    F: Future<Output = Result<T, E>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CallFailure::Cancelled),
        outcome = tokio::time::timeout(limit, call) => match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CallFailure::Failed(e)),
            Err(_) => Err(CallFailure::TimedOut(limit)),
        },
    }
}

/// Stores one upload and turns it into embedded chunks in both sinks.
///
/// Steps run strictly in order: blob put, extraction, chunking, optional
/// enrichment, then one embed + report insert + chat insert per chunk.
/// A failure stops the remaining steps; chunks already written stay.
pub struct IngestionPipeline {
    blob_store: Arc<dyn BlobStore>,
    document_extractor: Arc<dyn DocumentExtractor>,
    embedding_service: Arc<EmbeddingService>,
    report_sink: Arc<dyn ChunkSink>,
    chat_sink: Arc<dyn ChunkSink>,
    enricher: Option<Arc<DocumentEnricher>>,
    chunker: Chunker,
    settings: IngestionSettings,
    clock: MonotonicMillis,
}

impl IngestionPipeline {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        document_extractor: Arc<dyn DocumentExtractor>,
        embedding_service: Arc<EmbeddingService>,
        report_sink: Arc<dyn ChunkSink>,
        chat_sink: Arc<dyn ChunkSink>,
    ) -> Self {
        Self {
            blob_store,
            document_extractor,
            embedding_service,
            report_sink,
            chat_sink,
            enricher: None,
            chunker: Chunker::default(),
            settings: IngestionSettings::default(),
            clock: MonotonicMillis::new(),
        }
    }

    pub fn with_enricher(mut self, enricher: Arc<DocumentEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_settings(mut self, settings: IngestionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &IngestionSettings {
        &self.settings
    }

    pub async fn ingest(&self, request: IngestionRequest) -> Result<IngestionOutcome, IngestionError> {
        self.ingest_with_cancellation(request, &CancellationToken::new())
            .await
    }

    pub async fn ingest_with_cancellation(
        &self,
        request: IngestionRequest,
        cancel: &CancellationToken,
    ) -> Result<IngestionOutcome, IngestionError> {
        let media_type = self.validate(&request)?;
        let source_filename = SourceFilename::new(self.clock.next(), &request.original_filename)
            .map_err(IngestionError::InvalidInput)?;
        let storage_key = StorageKey::for_upload(&request.tenant, &source_filename);
        let user_note = request
            .user_note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
            .map(str::to_string);

        let cancelled = |chunks_written| IngestionError::Cancelled {
            source_filename: source_filename.to_string(),
            chunks_written,
        };

        bounded(
            cancel,
            self.settings.call_timeout,
            self.blob_store
                .put(storage_key.as_str(), &request.data, &media_type),
        )
        .await
        .map_err(|failure| match failure {
            CallFailure::Cancelled => cancelled(0),
            other => IngestionError::BlobStore {
                storage_key: storage_key.to_string(),
                message: other.message(),
            },
        })?;

        tracing::info!(
            "Stored upload {} ({} bytes, {}) for {}",
            storage_key,
            request.data.len(),
            media_type,
            request.tenant
        );

        let extracted = bounded(
            cancel,
            self.settings.extraction_timeout,
            self.document_extractor
                .extract_text_from_bytes(&request.data, &media_type),
        )
        .await
        .map_err(|failure| match failure {
            CallFailure::Cancelled => cancelled(0),
            other => IngestionError::Extraction {
                source_filename: source_filename.to_string(),
                message: other.message(),
            },
        })?;

        let text = extracted.text.as_str();
        let segments = if text.trim().is_empty() {
            Vec::new()
        } else {
            self.chunker.chunk(text)
        };

        tracing::debug!(
            "Extracted {} chars from {} via {:?}, {} chunks",
            text.chars().count(),
            source_filename,
            extracted.method,
            segments.len()
        );

        let insights = match &self.enricher {
            Some(enricher) if self.settings.enrich_documents && !segments.is_empty() => {
                enricher.enrich(text).await
            }
            _ => DocumentInsights::unavailable(),
        };
        let note = insights.summary.clone().or(user_note);

        let mut chunks_written = 0;
        for (chunk_index, sequence_text) in segments.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(cancelled(chunks_written));
            }

            let embedding = bounded(
                cancel,
                self.settings.embedding_timeout,
                self.embedding_service.embed(&sequence_text),
            )
            .await
            .map_err(|failure| match failure {
                CallFailure::Cancelled => cancelled(chunks_written),
                other => IngestionError::Embedding {
                    source_filename: source_filename.to_string(),
                    chunk_index,
                    chunks_written,
                    message: other.message(),
                },
            })?;

            let chunk = DocumentChunk::new(
                request.tenant.clone(),
                source_filename.clone(),
                chunk_index as i32,
                sequence_text,
                embedding,
                note.clone(),
            )
            .map_err(|e| IngestionError::Embedding {
                source_filename: source_filename.to_string(),
                chunk_index,
                chunks_written,
                message: e.to_string(),
            })?;

            for sink in [&self.report_sink, &self.chat_sink] {
                bounded(cancel, self.settings.call_timeout, sink.insert(&chunk))
                    .await
                    .map_err(|failure| match failure {
                        CallFailure::Cancelled => cancelled(chunks_written),
                        other => IngestionError::SinkWrite {
                            source_filename: source_filename.to_string(),
                            chunk_index,
                            sink: sink.kind(),
                            chunks_written,
                            message: other.message(),
                        },
                    })?;
            }

            chunks_written += 1;
        }

        tracing::info!(
            "Ingested {} into {} chunks for {}",
            source_filename,
            chunks_written,
            request.tenant
        );

        Ok(IngestionOutcome {
            source_filename,
            storage_key,
            chunk_count: chunks_written,
            extraction_method: extracted.method,
            note,
            summary: insights.summary,
            suggested_category: insights.category,
        })
    }

    /// Returns the normalised media type.
    fn validate(&self, request: &IngestionRequest) -> Result<String, IngestionError> {
        if request.data.is_empty() {
            return Err(IngestionError::InvalidInput(
                "Uploaded file is empty".to_string(),
            ));
        }

        if request.data.len() > self.settings.max_upload_bytes {
            return Err(IngestionError::InvalidInput(format!(
                "Uploaded file is {} bytes, the limit is {}",
                request.data.len(),
                self.settings.max_upload_bytes
            )));
        }

        if request.original_filename.trim().is_empty() {
            return Err(IngestionError::InvalidInput(
                "Original filename cannot be empty".to_string(),
            ));
        }

        let media_type = essence(&request.media_type);
        match media_type.split_once('/') {
            Some((kind, subtype)) if !kind.is_empty() && !subtype.is_empty() => Ok(media_type),
            _ => Err(IngestionError::InvalidInput(format!(
                "Invalid media type: {:?}",
                request.media_type
            ))),
        }
    }
}
