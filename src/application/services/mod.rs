pub mod answer_composer;
pub mod chunker;
pub mod document_catalog;
pub mod document_enricher;
pub mod embedding_service;
pub mod ingestion_pipeline;
pub mod report_generator;
pub mod retrieval_service;

pub use answer_composer::{AnswerComposer, ComposedAnswer};
pub use chunker::Chunker;
pub use document_catalog::DocumentCatalog;
pub use document_enricher::DocumentEnricher;
pub use embedding_service::EmbeddingService;
pub use ingestion_pipeline::{IngestionPipeline, IngestionSettings};
pub use report_generator::ReportGenerator;
pub use retrieval_service::RetrievalService;
