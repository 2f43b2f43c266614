use chrono::{DateTime, Utc};
use diesel::prelude::*;
use pgvector::Vector;
use uuid::Uuid;

use crate::domain::entities::DocumentChunk;
use crate::domain::repositories::ChunkSinkError;
use crate::domain::value_objects::{Category, SourceFilename, Tenant};

/// A row of either sink table, selected in column order.
#[derive(Debug, Clone, Queryable)]
pub struct ChunkRow {
    pub id: Uuid,
    pub accountant_id: String,
    pub client_id: String,
    pub source_filename: String,
    pub chunk_index: i32,
    pub sequence_text: String,
    pub embedding: Vector,
    pub category: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&DocumentChunk> for ChunkRow {
    fn from(chunk: &DocumentChunk) -> Self {
        Self {
            id: chunk.id(),
            accountant_id: chunk.tenant().accountant().to_string(),
            client_id: chunk.tenant().client().to_string(),
            source_filename: chunk.source_filename().as_str().to_string(),
            chunk_index: chunk.chunk_index(),
            sequence_text: chunk.sequence_text().to_string(),
            embedding: chunk.embedding().clone(),
            category: chunk.category().map(|c| c.as_str().to_string()),
            note: chunk.note().map(|n| n.to_string()),
            created_at: chunk.created_at(),
        }
    }
}

impl TryFrom<ChunkRow> for DocumentChunk {
    type Error = ChunkSinkError;

    fn try_from(row: ChunkRow) -> Result<Self, Self::Error> {
        let tenant = Tenant::new(&row.accountant_id, &row.client_id).map_err(|e| {
            ChunkSinkError::ValidationError(format!("Stored chunk {} has {}", row.id, e))
        })?;

        Ok(DocumentChunk::restore(
            row.id,
            tenant,
            SourceFilename::from_stored(row.source_filename),
            row.chunk_index,
            row.sequence_text,
            row.embedding,
            row.category.as_deref().and_then(Category::parse_stored),
            row.note,
            row.created_at,
        ))
    }
}
