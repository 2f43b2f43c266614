//! Test doubles for the application ports.

use async_trait::async_trait;
use pgvector::Vector;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::application::ports::blob_store::{BlobEntry, BlobStore, BlobStoreError, StoredBlob};
use crate::application::ports::document_extractor::{
    DocumentExtractionError, DocumentExtractor, ExtractedText, ExtractionMethod,
};
use crate::application::ports::embedding_provider::{
    EmbeddingProvider, EmbeddingProviderError, EmbeddingRequest, EmbeddingResponse,
};
use crate::application::ports::text_generator::{ChatMessage, TextGenerationError, TextGenerator};

/// Bag-of-characters embedding: identical text gives identical vectors.
pub fn char_histogram(text: &str, dimension: usize) -> Vector {
    let mut values = vec![0.0f32; dimension];
    for c in text.chars() {
        values[(c as usize) % dimension] += 1.0;
    }
    values[0] += 0.001;
    Vector::from(values)
}

pub struct FakeEmbeddingProvider {
    dimension: usize,
    declared_dimension: usize,
    fail_on_call: Option<usize>,
    calls: AtomicUsize,
}

impl FakeEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            declared_dimension: dimension,
            fail_on_call: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails the n-th call (1-based) and every call after it.
    pub fn failing_from_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn with_declared_dimension(mut self, dimension: usize) -> Self {
        self.declared_dimension = dimension;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_call(&self) -> Result<(), EmbeddingProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.fail_on_call {
            Some(limit) if call >= limit => Err(EmbeddingProviderError::ServiceUnavailable),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddingProvider {
    async fn generate_embedding(
        &self,
        request: EmbeddingRequest,
    ) -> Result<EmbeddingResponse, EmbeddingProviderError> {
        self.next_call()?;
        Ok(EmbeddingResponse {
            embedding: char_histogram(&request.text, self.dimension),
            model_name: "fake".to_string(),
            token_count: None,
        })
    }

    fn model_info(&self) -> String {
        "fake".to_string()
    }

    fn embedding_dimension(&self) -> usize {
        self.declared_dimension
    }
}

/// Answers every completion with a fixed reply, or fails every call.
pub struct FakeTextGenerator {
    reply: Result<String, String>,
    delay: Duration,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeTextGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err("model unavailable".to_string()),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeTextGenerator {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, TextGenerationError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply
            .clone()
            .map_err(TextGenerationError::NetworkError)
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, (Vec<u8>, String)>>,
    fail_puts: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            blobs: Mutex::new(BTreeMap::new()),
            fail_puts: true,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.blobs.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<StoredBlob, BlobStoreError> {
        if self.fail_puts {
            return Err(BlobStoreError::IoError("disk full".to_string()));
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), (data.to_vec(), content_type.to_string()));
        Ok(StoredBlob {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: Some(content_type.to_string()),
        })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, BlobStoreError> {
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, (data, _))| BlobEntry {
                key: key.clone(),
                size: data.len() as u64,
                last_modified: None,
            })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobStoreError> {
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| BlobStoreError::NotFound(key.to_string()))
    }

    async fn sign_url(&self, key: &str, ttl: Duration) -> Result<String, BlobStoreError> {
        Ok(format!("memory://{}?ttl={}", key, ttl.as_secs()))
    }

    fn verify_signature(&self, _key: &str, _expires: i64, signature: &str) -> bool {
        signature == "valid"
    }
}

/// Returns the same text for every document and counts calls.
pub struct StaticExtractor {
    result: Result<String, String>,
    calls: AtomicUsize,
}

impl StaticExtractor {
    pub fn with_text(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn corrupt() -> Self {
        Self {
            result: Err("xref table not found".to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentExtractor for StaticExtractor {
    async fn extract_text_from_bytes(
        &self,
        _data: &[u8],
        _media_type: &str,
    ) -> Result<ExtractedText, DocumentExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(text) => Ok(ExtractedText {
                text: text.clone(),
                method: ExtractionMethod::Direct,
                page_count: Some(1),
            }),
            Err(msg) => Err(DocumentExtractionError::CorruptedFile(msg.clone())),
        }
    }

    fn can_extract(&self, _media_type: &str) -> bool {
        true
    }
}
