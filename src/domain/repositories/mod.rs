pub mod chunk_sink;

pub use chunk_sink::{ChunkSink, ChunkSinkError, SinkKind};
