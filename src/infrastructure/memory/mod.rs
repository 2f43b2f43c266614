pub mod in_memory_chunk_sink;

pub use in_memory_chunk_sink::InMemoryChunkSink;
