use async_trait::async_trait;
use pgvector::Vector;

use crate::domain::entities::{DocumentChunk, ScoredChunk};
use crate::domain::value_objects::{SourceFilename, Tenant};

#[derive(Debug, thiserror::Error)]
pub enum ChunkSinkError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Which downstream reader a sink serves. Both sinks hold the same rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Report,
    Chat,
}

impl SinkKind {
    pub fn table_name(&self) -> &'static str {
        match self {
            SinkKind::Report => "report_chunks",
            SinkKind::Chat => "chat_chunks",
        }
    }
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::Report => f.write_str("report"),
            SinkKind::Chat => f.write_str("chat"),
        }
    }
}

#[async_trait]
pub trait ChunkSink: Send + Sync {
    fn kind(&self) -> SinkKind;

    async fn insert(&self, chunk: &DocumentChunk) -> Result<(), ChunkSinkError>;

    /// Chunks of one upload in position order.
    async fn find_by_upload(
        &self,
        tenant: &Tenant,
        source_filename: &SourceFilename,
    ) -> Result<Vec<DocumentChunk>, ChunkSinkError>;

    /// Every chunk of a tenant, oldest upload first, in position order.
    async fn find_by_tenant(&self, tenant: &Tenant) -> Result<Vec<DocumentChunk>, ChunkSinkError>;

    /// Nearest neighbours of `query_vector` among the tenant's chunks,
    /// best match first.
    async fn similarity_search(
        &self,
        tenant: &Tenant,
        query_vector: &Vector,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, ChunkSinkError>;
}
