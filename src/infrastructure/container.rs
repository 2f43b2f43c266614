use anyhow::Context;
use std::sync::Arc;

use crate::{
    application::{
        ports::{BlobStore, DocumentExtractor, EmbeddingProvider, TextGenerator},
        services::{
            AnswerComposer, Chunker, DocumentCatalog, DocumentEnricher, EmbeddingService,
            IngestionPipeline, ReportGenerator, RetrievalService,
        },
        use_cases::{
            AskAssistantUseCase, ChatWithDocumentsUseCase, DownloadDocumentUseCase,
            GenerateReportUseCase, ListDocumentsUseCase, UploadDocumentUseCase,
        },
    },
    config::{AppConfig, StorageBackend},
    domain::repositories::{ChunkSink, SinkKind},
    infrastructure::{
        database::{PostgresChunkSink, create_connection_pool, run_migrations},
        external_services::{
            ChatCompletionClient, InferenceClient, InferenceEmbeddingProvider,
            document_extractors::{
                CompositeDocumentExtractor, OcrFallback, PdfExtractor, PdftoppmRasterizer,
                TesseractOcrEngine,
            },
        },
        file_system::LocalBlobStore,
        memory::InMemoryChunkSink,
    },
    presentation::http::{
        HttpServer,
        handlers::{ChatHandler, DocumentHandler, ReportHandler},
    },
};

pub struct AppContainer {
    pub config: AppConfig,

    // Sinks
    pub report_sink: Arc<dyn ChunkSink>,
    pub chat_sink: Arc<dyn ChunkSink>,

    // External Services
    pub blob_store: Arc<dyn BlobStore>,
    pub embedding_provider: Arc<dyn EmbeddingProvider>,
    pub text_generator: Arc<dyn TextGenerator>,
    pub document_extractor: Arc<dyn DocumentExtractor>,

    // Application Services
    pub ingestion_pipeline: Arc<IngestionPipeline>,
    pub retrieval_service: Arc<RetrievalService>,
    pub answer_composer: Arc<AnswerComposer>,
    pub report_generator: Arc<ReportGenerator>,
    pub document_catalog: Arc<DocumentCatalog>,

    // HTTP Handlers
    pub document_handler: Arc<DocumentHandler>,
    pub chat_handler: Arc<ChatHandler>,
    pub report_handler: Arc<ReportHandler>,
}

impl AppContainer {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let (report_sink, chat_sink) = Self::create_sinks(&config).await?;

        let local_store = LocalBlobStore::new(
            config.blob_store.upload_dir.clone(),
            config.blob_store.public_base_url.clone(),
            config.blob_store.signing_secret.clone(),
        );
        local_store
            .ensure_directory_exists()
            .await
            .with_context(|| {
                format!(
                    "Failed to create upload directory {}",
                    config.blob_store.upload_dir.display()
                )
            })?;
        let blob_store: Arc<dyn BlobStore> = Arc::new(local_store);

        let embedding_provider: Arc<dyn EmbeddingProvider> = Arc::new(
            InferenceEmbeddingProvider::new(
                InferenceClient::new(config.embeddings.clone())
                    .context("Failed to create embeddings client")?,
            ),
        );
        let text_generator: Arc<dyn TextGenerator> = Arc::new(
            ChatCompletionClient::new(config.chat.clone())
                .context("Failed to create chat completion client")?,
        );

        let mut pdf_extractor = PdfExtractor::new();
        if config.ocr.enabled {
            let engine = TesseractOcrEngine::new(config.ocr.language.clone());
            let mut ocr = OcrFallback::new(Arc::new(PdftoppmRasterizer), Arc::new(engine))
                .with_dpi(config.ocr.dpi);
            if let Some(scratch_dir) = &config.ocr.scratch_dir {
                ocr = ocr.with_scratch_root(scratch_dir.clone());
            }
            pdf_extractor = pdf_extractor.with_ocr(Arc::new(ocr));
        }
        let document_extractor: Arc<dyn DocumentExtractor> =
            Arc::new(CompositeDocumentExtractor::new(Arc::new(pdf_extractor)));

        // Application services
        let pipeline_config = &config.pipeline;
        let generation_timeout = config.generation_timeout();
        let embedding_service = Arc::new(EmbeddingService::new(embedding_provider.clone()));
        let chunker = Chunker::new(pipeline_config.chunk_size).map_err(anyhow::Error::msg)?;

        let ingestion_pipeline = Arc::new(
            IngestionPipeline::new(
                blob_store.clone(),
                document_extractor.clone(),
                embedding_service.clone(),
                report_sink.clone(),
                chat_sink.clone(),
            )
            .with_chunker(chunker)
            .with_enricher(Arc::new(DocumentEnricher::new(
                text_generator.clone(),
                generation_timeout,
            )))
            .with_settings(config.ingestion_settings()),
        );

        let retrieval_service = Arc::new(
            RetrievalService::new(embedding_service, chat_sink.clone(), pipeline_config.call_timeout)
                .with_embedding_timeout(config.embedding_timeout()),
        );
        let answer_composer = Arc::new(
            AnswerComposer::new(text_generator.clone(), generation_timeout)
                .with_max_context_chars(pipeline_config.max_context_chars),
        );
        let report_generator = Arc::new(
            ReportGenerator::new(
                report_sink.clone(),
                text_generator.clone(),
                generation_timeout,
            )
            .with_max_report_chars(pipeline_config.max_report_chars),
        );
        let document_catalog = Arc::new(
            DocumentCatalog::new(blob_store.clone())
                .with_url_ttl(config.blob_store.signed_url_ttl),
        );

        // Use cases and handlers
        let expose_error_details = config.server.expose_error_details;

        let document_handler = Arc::new(DocumentHandler::new(
            Arc::new(UploadDocumentUseCase::new(
                ingestion_pipeline.clone(),
                document_catalog.clone(),
            )),
            Arc::new(ListDocumentsUseCase::new(document_catalog.clone())),
            Arc::new(DownloadDocumentUseCase::new(document_catalog.clone())),
            expose_error_details,
        ));
        let chat_handler = Arc::new(ChatHandler::new(
            Arc::new(ChatWithDocumentsUseCase::new(
                retrieval_service.clone(),
                answer_composer.clone(),
            )),
            Arc::new(AskAssistantUseCase::new(text_generator.clone(), generation_timeout)),
            expose_error_details,
        ));
        let report_handler = Arc::new(ReportHandler::new(
            Arc::new(GenerateReportUseCase::new(report_generator.clone())),
            expose_error_details,
        ));

        Ok(Self {
            config,
            report_sink,
            chat_sink,
            blob_store,
            embedding_provider,
            text_generator,
            document_extractor,
            ingestion_pipeline,
            retrieval_service,
            answer_composer,
            report_generator,
            document_catalog,
            document_handler,
            chat_handler,
            report_handler,
        })
    }

    async fn create_sinks(
        config: &AppConfig,
    ) -> anyhow::Result<(Arc<dyn ChunkSink>, Arc<dyn ChunkSink>)> {
        match &config.storage {
            StorageBackend::Postgres(database) => {
                let pool = create_connection_pool(database)
                    .context("Failed to create database connection pool")?;
                let migration_pool = pool.clone();
                tokio::task::spawn_blocking(move || run_migrations(&migration_pool))
                    .await
                    .context("Migration task failed")?
                    .context("Failed to run database migrations")?;

                tracing::info!("Using PostgreSQL chunk sinks");
                Ok((
                    Arc::new(PostgresChunkSink::new(pool.clone(), SinkKind::Report)),
                    Arc::new(PostgresChunkSink::new(pool, SinkKind::Chat)),
                ))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory chunk sinks, data is lost on restart");
                Ok((
                    Arc::new(InMemoryChunkSink::new(SinkKind::Report)),
                    Arc::new(InMemoryChunkSink::new(SinkKind::Chat)),
                ))
            }
        }
    }

    pub fn http_server(&self) -> HttpServer {
        HttpServer::new(
            self.document_handler.clone(),
            self.chat_handler.clone(),
            self.report_handler.clone(),
            self.config.pipeline.max_upload_bytes,
            Some(self.config.server.port),
        )
    }
}
