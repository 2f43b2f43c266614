use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{Category, SourceFilename, Tenant};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentChunkError {
    #[error("Chunk embedding cannot be empty")]
    EmptyEmbedding,
    #[error("Chunk index cannot be negative: {0}")]
    NegativeIndex(i32),
}

/// One retrievable slice of an uploaded document, as stored in each sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    id: Uuid,
    tenant: Tenant,
    source_filename: SourceFilename,
    chunk_index: i32,
    sequence_text: String,
    embedding: Vector,
    category: Option<Category>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl DocumentChunk {
    pub fn new(
        tenant: Tenant,
        source_filename: SourceFilename,
        chunk_index: i32,
        sequence_text: String,
        embedding: Vector,
        note: Option<String>,
    ) -> Result<Self, DocumentChunkError> {
        if chunk_index < 0 {
            return Err(DocumentChunkError::NegativeIndex(chunk_index));
        }
        if embedding.as_slice().is_empty() {
            return Err(DocumentChunkError::EmptyEmbedding);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            tenant,
            source_filename,
            chunk_index,
            sequence_text,
            embedding,
            category: None,
            note,
            created_at: Utc::now(),
        })
    }

    /// Rebuilds a chunk read back from storage, keeping its persisted identity.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        tenant: Tenant,
        source_filename: SourceFilename,
        chunk_index: i32,
        sequence_text: String,
        embedding: Vector,
        category: Option<Category>,
        note: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant,
            source_filename,
            chunk_index,
            sequence_text,
            embedding,
            category,
            note,
            created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    pub fn source_filename(&self) -> &SourceFilename {
        &self.source_filename
    }

    pub fn chunk_index(&self) -> i32 {
        self.chunk_index
    }

    pub fn sequence_text(&self) -> &str {
        &self.sequence_text
    }

    pub fn embedding(&self) -> &Vector {
        &self.embedding
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn dimension(&self) -> usize {
        self.embedding.as_slice().len()
    }

    pub fn character_count(&self) -> usize {
        self.sequence_text.chars().count()
    }

    pub fn belongs_to(&self, tenant: &Tenant) -> bool {
        &self.tenant == tenant
    }

    pub fn belongs_to_upload(&self, tenant: &Tenant, source_filename: &SourceFilename) -> bool {
        self.belongs_to(tenant) && &self.source_filename == source_filename
    }

    /// Cosine similarity between this chunk's embedding and `query`.
    /// Mismatched dimensions or zero vectors score 0.
    pub fn cosine_similarity(&self, query: &Vector) -> f32 {
        cosine_similarity(self.embedding.as_slice(), query.as_slice())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
