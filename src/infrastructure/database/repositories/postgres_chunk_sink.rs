use async_trait::async_trait;
use diesel::prelude::*;
use pgvector::{Vector, VectorExpressionMethods};

use crate::domain::entities::{DocumentChunk, ScoredChunk};
use crate::domain::repositories::chunk_sink::{ChunkSink, ChunkSinkError, SinkKind};
use crate::domain::value_objects::{SourceFilename, Tenant};
use crate::infrastructure::database::models::ChunkRow;
use crate::infrastructure::database::{DbPool, get_connection_from_pool};

/// Runs `$body` with `$table` bound to the schema module of the sink table.
macro_rules! with_sink_table {
    ($kind:expr, $table:ident => $body:expr) => {
        match $kind {
            SinkKind::Report => {
                use crate::infrastructure::database::schema::report_chunks as $table;
                $body
            }
            SinkKind::Chat => {
                use crate::infrastructure::database::schema::chat_chunks as $table;
                $body
            }
        }
    };
}

/// Columns in [`ChunkRow`] field order.
macro_rules! chunk_columns {
    ($table:ident) => {
        (
            $table::id,
            $table::accountant_id,
            $table::client_id,
            $table::source_filename,
            $table::chunk_index,
            $table::sequence_text,
            $table::embedding,
            $table::category,
            $table::note,
            $table::created_at,
        )
    };
}

/// One of the two pgvector-backed chunk tables.
pub struct PostgresChunkSink {
    pool: DbPool,
    kind: SinkKind,
}

impl PostgresChunkSink {
    pub fn new(pool: DbPool, kind: SinkKind) -> Self {
        Self { pool, kind }
    }

    async fn run<T, F>(&self, op: F) -> Result<T, ChunkSinkError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> QueryResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || -> Result<T, ChunkSinkError> {
            let mut conn = get_connection_from_pool(&pool)
                .map_err(|e| ChunkSinkError::DatabaseError(e.to_string()))?;
            op(&mut conn).map_err(|e| ChunkSinkError::DatabaseError(e.to_string()))
        })
        .await
        .map_err(|e| ChunkSinkError::DatabaseError(format!("Database task failed: {}", e)))?
    }
}

/// pgvector's `<=>` is cosine distance.
fn similarity_from_distance(distance: f64) -> f32 {
    (1.0 - distance) as f32
}

fn into_chunks(rows: Vec<ChunkRow>) -> Result<Vec<DocumentChunk>, ChunkSinkError> {
    rows.into_iter().map(DocumentChunk::try_from).collect()
}

#[async_trait]
impl ChunkSink for PostgresChunkSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    async fn insert(&self, chunk: &DocumentChunk) -> Result<(), ChunkSinkError> {
        let kind = self.kind;
        let row = ChunkRow::from(chunk);

        self.run(move |conn| {
            with_sink_table!(kind, t => diesel::insert_into(t::table)
                .values((
                    t::id.eq(row.id),
                    t::accountant_id.eq(row.accountant_id),
                    t::client_id.eq(row.client_id),
                    t::source_filename.eq(row.source_filename),
                    t::chunk_index.eq(row.chunk_index),
                    t::sequence_text.eq(row.sequence_text),
                    t::embedding.eq(row.embedding),
                    t::category.eq(row.category),
                    t::note.eq(row.note),
                    t::created_at.eq(row.created_at),
                ))
                .execute(conn))
        })
        .await?;

        Ok(())
    }

    async fn find_by_upload(
        &self,
        tenant: &Tenant,
        source_filename: &SourceFilename,
    ) -> Result<Vec<DocumentChunk>, ChunkSinkError> {
        let kind = self.kind;
        let accountant = tenant.accountant().to_string();
        let client = tenant.client().to_string();
        let source_filename = source_filename.as_str().to_string();

        let rows = self
            .run(move |conn| {
                with_sink_table!(kind, t => t::table
                    .filter(t::accountant_id.eq(accountant))
                    .filter(t::client_id.eq(client))
                    .filter(t::source_filename.eq(source_filename))
                    .order(t::chunk_index.asc())
                    .select(chunk_columns!(t))
                    .load::<ChunkRow>(conn))
            })
            .await?;

        into_chunks(rows)
    }

    async fn find_by_tenant(&self, tenant: &Tenant) -> Result<Vec<DocumentChunk>, ChunkSinkError> {
        let kind = self.kind;
        let accountant = tenant.accountant().to_string();
        let client = tenant.client().to_string();

        let rows = self
            .run(move |conn| {
                with_sink_table!(kind, t => t::table
                    .filter(t::accountant_id.eq(accountant))
                    .filter(t::client_id.eq(client))
                    .order((
                        t::created_at.asc(),
                        t::source_filename.asc(),
                        t::chunk_index.asc(),
                    ))
                    .select(chunk_columns!(t))
                    .load::<ChunkRow>(conn))
            })
            .await?;

        into_chunks(rows)
    }

    async fn similarity_search(
        &self,
        tenant: &Tenant,
        query_vector: &Vector,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, ChunkSinkError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let kind = self.kind;
        let accountant = tenant.accountant().to_string();
        let client = tenant.client().to_string();
        let query = query_vector.clone();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = self
            .run(move |conn| {
                with_sink_table!(kind, t => t::table
                    .filter(t::accountant_id.eq(accountant))
                    .filter(t::client_id.eq(client))
                    .select((chunk_columns!(t), t::embedding.cosine_distance(query.clone())))
                    .order((
                        t::embedding.cosine_distance(query),
                        t::source_filename.asc(),
                        t::chunk_index.asc(),
                    ))
                    .limit(limit)
                    .load::<(ChunkRow, f64)>(conn))
            })
            .await?;

        tracing::debug!(
            "{} sink returned {} neighbours for {}",
            self.kind,
            rows.len(),
            tenant
        );

        rows.into_iter()
            .map(|(row, distance)| -> Result<ScoredChunk, ChunkSinkError> {
                Ok(ScoredChunk::new(
                    DocumentChunk::try_from(row)?,
                    similarity_from_distance(distance),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_maps_to_similarity() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
        assert_eq!(similarity_from_distance(1.0), 0.0);
        assert_eq!(similarity_from_distance(2.0), -1.0);
    }
}
