use serde::Serialize;
use std::cmp::Ordering;

use super::DocumentChunk;
use crate::domain::value_objects::Tenant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub similarity_score: f32,
}

impl ScoredChunk {
    pub fn new(chunk: DocumentChunk, similarity_score: f32) -> Self {
        Self {
            chunk,
            similarity_score,
        }
    }

    /// Descending score, then upload name and position so equal scores
    /// always come back in the same order.
    pub fn ranking(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.source_filename().cmp(b.chunk.source_filename()))
            .then_with(|| a.chunk.chunk_index().cmp(&b.chunk.chunk_index()))
            .then_with(|| a.chunk.id().cmp(&b.chunk.id()))
    }
}

/// Top-K chunks for one tenant, best match first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    tenant: Tenant,
    matches: Vec<ScoredChunk>,
}

impl RetrievalResult {
    /// Builds a result for `tenant`, dropping anything that belongs to another
    /// tenant, ranking what is left and keeping at most `limit` entries.
    /// Returns the result together with the number of foreign rows dropped.
    pub fn for_tenant(tenant: Tenant, candidates: Vec<ScoredChunk>, limit: usize) -> (Self, usize) {
        let before = candidates.len();
        let mut matches: Vec<ScoredChunk> = candidates
            .into_iter()
            .filter(|scored| scored.chunk.belongs_to(&tenant))
            .collect();
        let dropped = before - matches.len();

        matches.sort_by(ScoredChunk::ranking);
        matches.truncate(limit);

        (Self { tenant, matches }, dropped)
    }

    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    pub fn matches(&self) -> &[ScoredChunk] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
