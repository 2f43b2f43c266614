pub mod postgres_chunk_sink;

pub use postgres_chunk_sink::PostgresChunkSink;
