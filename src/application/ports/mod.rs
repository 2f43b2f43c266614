pub mod blob_store;
pub mod document_extractor;
pub mod embedding_provider;
pub mod text_generator;

pub use blob_store::BlobStore;
pub use document_extractor::DocumentExtractor;
pub use embedding_provider::EmbeddingProvider;
pub use text_generator::TextGenerator;
