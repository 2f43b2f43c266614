use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("Blob not found: {0}")]
    NotFound(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Signing error: {0}")]
    SigningError(String),
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub key: String,
    pub size: u64,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BlobEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Raw upload storage. Keys are `/`-separated, e.g. `accountant/client/name`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<StoredBlob, BlobStoreError>;

    /// Entries whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, BlobStoreError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobStoreError>;

    async fn sign_url(&self, key: &str, ttl: Duration) -> Result<String, BlobStoreError>;

    /// Checks a signature previously produced by [`BlobStore::sign_url`].
    fn verify_signature(&self, key: &str, expires: i64, signature: &str) -> bool;
}
