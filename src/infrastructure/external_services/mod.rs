pub mod chat_completion_client;
pub mod document_extractors;
pub mod inference_client;

pub use chat_completion_client::{ChatCompletionClient, ChatCompletionConfig};
pub use inference_client::{EmbeddingsClientConfig, InferenceClient, InferenceEmbeddingProvider, RetryPolicy};
