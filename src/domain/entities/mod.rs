pub mod document_chunk;
pub mod retrieval_result;
pub mod upload_record;

pub use document_chunk::DocumentChunk;
pub use retrieval_result::{RetrievalResult, ScoredChunk};
pub use upload_record::UploadRecord;
