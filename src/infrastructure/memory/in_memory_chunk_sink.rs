use async_trait::async_trait;
use pgvector::Vector;
use tokio::sync::RwLock;

use crate::domain::entities::{DocumentChunk, ScoredChunk};
use crate::domain::repositories::chunk_sink::{ChunkSink, ChunkSinkError, SinkKind};
use crate::domain::value_objects::{SourceFilename, Tenant};

/// Process-local sink used with `STORAGE_BACKEND=memory` and in tests.
/// Rows keep insertion order.
pub struct InMemoryChunkSink {
    kind: SinkKind,
    rows: RwLock<Vec<DocumentChunk>>,
}

impl InMemoryChunkSink {
    pub fn new(kind: SinkKind) -> Self {
        Self {
            kind,
            rows: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ChunkSink for InMemoryChunkSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    async fn insert(&self, chunk: &DocumentChunk) -> Result<(), ChunkSinkError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|row| row.id() == chunk.id()) {
            return Err(ChunkSinkError::ValidationError(format!(
                "Chunk {} already exists in the {} sink",
                chunk.id(),
                self.kind
            )));
        }
        rows.push(chunk.clone());
        Ok(())
    }

    async fn find_by_upload(
        &self,
        tenant: &Tenant,
        source_filename: &SourceFilename,
    ) -> Result<Vec<DocumentChunk>, ChunkSinkError> {
        let rows = self.rows.read().await;
        let mut chunks: Vec<DocumentChunk> = rows
            .iter()
            .filter(|row| row.belongs_to_upload(tenant, source_filename))
            .cloned()
            .collect();
        chunks.sort_by_key(|chunk| chunk.chunk_index());
        Ok(chunks)
    }

    async fn find_by_tenant(&self, tenant: &Tenant) -> Result<Vec<DocumentChunk>, ChunkSinkError> {
        let rows = self.rows.read().await;
        let mut chunks: Vec<DocumentChunk> = rows
            .iter()
            .filter(|row| row.belongs_to(tenant))
            .cloned()
            .collect();
        chunks.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.source_filename().cmp(b.source_filename()))
                .then_with(|| a.chunk_index().cmp(&b.chunk_index()))
        });
        Ok(chunks)
    }

    async fn similarity_search(
        &self,
        tenant: &Tenant,
        query_vector: &Vector,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, ChunkSinkError> {
        let rows = self.rows.read().await;
        let mut scored: Vec<ScoredChunk> = rows
            .iter()
            .filter(|row| row.belongs_to(tenant))
            .filter(|row| row.dimension() == query_vector.as_slice().len())
            .map(|row| ScoredChunk::new(row.clone(), row.cosine_similarity(query_vector)))
            .collect();

        scored.sort_by(ScoredChunk::ranking);
        scored.truncate(limit);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(tenant: &Tenant, name: &str, index: i32, values: Vec<f32>) -> DocumentChunk {
        DocumentChunk::new(
            tenant.clone(),
            SourceFilename::from_stored(name.to_string()),
            index,
            format!("{} #{}", name, index),
            Vector::from(values),
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_similarity_search_is_tenant_scoped_and_ranked() {
        let sink = InMemoryChunkSink::new(SinkKind::Chat);
        let acme = Tenant::new("acc1", "acme").unwrap();
        let other = Tenant::new("acc1", "other").unwrap();

        sink.insert(&chunk(&acme, "1-a.pdf", 0, vec![1.0, 0.0])).await.unwrap();
        sink.insert(&chunk(&acme, "1-a.pdf", 1, vec![0.0, 1.0])).await.unwrap();
        sink.insert(&chunk(&other, "2-b.pdf", 0, vec![1.0, 0.0])).await.unwrap();

        let results = sink
            .similarity_search(&acme, &Vector::from(vec![1.0, 0.1]), 10)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.chunk.belongs_to(&acme)));
        assert_eq!(results[0].chunk.chunk_index(), 0);
        assert!(results[0].similarity_score > results[1].similarity_score);
    }

    #[tokio::test]
    async fn test_equal_scores_order_by_upload_and_position() {
        let sink = InMemoryChunkSink::new(SinkKind::Chat);
        let tenant = Tenant::new("acc1", "acme").unwrap();

        sink.insert(&chunk(&tenant, "2-b.pdf", 1, vec![1.0, 0.0])).await.unwrap();
        sink.insert(&chunk(&tenant, "2-b.pdf", 0, vec![1.0, 0.0])).await.unwrap();
        sink.insert(&chunk(&tenant, "1-a.pdf", 3, vec![1.0, 0.0])).await.unwrap();

        let results = sink
            .similarity_search(&tenant, &Vector::from(vec![1.0, 0.0]), 3)
            .await
            .unwrap();
        let order: Vec<(String, i32)> = results
            .iter()
            .map(|r| (r.chunk.source_filename().to_string(), r.chunk.chunk_index()))
            .collect();

        assert_eq!(
            order,
            vec![
                ("1-a.pdf".to_string(), 3),
                ("2-b.pdf".to_string(), 0),
                ("2-b.pdf".to_string(), 1)
            ]
        );
    }

    #[tokio::test]
    async fn test_find_by_upload_returns_position_order() {
        let sink = InMemoryChunkSink::new(SinkKind::Report);
        let tenant = Tenant::new("acc1", "acme").unwrap();

        sink.insert(&chunk(&tenant, "1-a.pdf", 1, vec![1.0])).await.unwrap();
        sink.insert(&chunk(&tenant, "1-a.pdf", 0, vec![1.0])).await.unwrap();
        sink.insert(&chunk(&tenant, "2-b.pdf", 0, vec![1.0])).await.unwrap();

        let upload = sink
            .find_by_upload(&tenant, &SourceFilename::from_stored("1-a.pdf".to_string()))
            .await
            .unwrap();

        let indexes: Vec<i32> = upload.iter().map(|c| c.chunk_index()).collect();
        assert_eq!(indexes, vec![0, 1]);
        assert_eq!(sink.len().await, 3);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let sink = InMemoryChunkSink::new(SinkKind::Report);
        let tenant = Tenant::new("acc1", "acme").unwrap();
        let row = chunk(&tenant, "1-a.pdf", 0, vec![1.0]);

        sink.insert(&row).await.unwrap();
        assert!(sink.insert(&row).await.is_err());
    }
}
