use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::errors::{Classified, ErrorClass};
use crate::application::ports::BlobStore;
use crate::application::ports::blob_store::BlobStoreError;
use crate::domain::entities::UploadRecord;
use crate::domain::value_objects::tenant::validate_segment;
use crate::domain::value_objects::{StorageKey, record_key_for};

pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid listing scope: {0}")]
    InvalidScope(String),
    #[error("Download link is invalid or has expired")]
    InvalidLink,
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Blob store error: {0}")]
    BlobStoreError(String),
    #[error("Upload record could not be encoded: {0}")]
    RecordEncoding(String),
}

impl Classified for CatalogError {
    fn class(&self) -> ErrorClass {
        match self {
            CatalogError::InvalidScope(_) | CatalogError::InvalidLink | CatalogError::NotFound(_) => {
                ErrorClass::Input
            }
            CatalogError::BlobStoreError(_) | CatalogError::RecordEncoding(_) => {
                ErrorClass::DependentService
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub key: String,
    pub name: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub signed_url: String,
    /// Missing for blobs stored without a record.
    pub record: Option<UploadRecord>,
}

/// Lists stored uploads of an accountant, optionally narrowed to one client,
/// together with the record kept for each upload.
pub struct DocumentCatalog {
    blob_store: Arc<dyn BlobStore>,
    url_ttl: Duration,
}

impl DocumentCatalog {
    pub fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            blob_store,
            url_ttl: DEFAULT_SIGNED_URL_TTL,
        }
    }

    pub fn with_url_ttl(mut self, url_ttl: Duration) -> Self {
        self.url_ttl = url_ttl;
        self
    }

    pub async fn list(
        &self,
        accountant: &str,
        client: Option<&str>,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let accountant = validate_segment("accountant", accountant)
            .map_err(|e| CatalogError::InvalidScope(e.to_string()))?
            .ok_or_else(|| CatalogError::InvalidScope("Missing accountant identifier".to_string()))?;

        let prefix = match client {
            Some(client) => match validate_segment("client", client)
                .map_err(|e| CatalogError::InvalidScope(e.to_string()))?
            {
                Some(client) => format!("{}/{}/", accountant, client),
                None => format!("{}/", accountant),
            },
            None => format!("{}/", accountant),
        };

        let blobs = self
            .blob_store
            .list(&prefix)
            .await
            .map_err(|e| CatalogError::BlobStoreError(e.to_string()))?;

        let mut entries = Vec::with_capacity(blobs.len());
        for blob in blobs {
            let signed_url = self
                .blob_store
                .sign_url(&blob.key, self.url_ttl)
                .await
                .map_err(|e| CatalogError::BlobStoreError(e.to_string()))?;
            let name = blob
                .key
                .rsplit('/')
                .next()
                .unwrap_or(blob.key.as_str())
                .to_string();
            let record = self.read_record(&blob.key).await;

            entries.push(CatalogEntry {
                key: blob.key,
                name,
                size: blob.size,
                last_modified: blob.last_modified,
                signed_url,
                record,
            });
        }

        tracing::debug!("Listed {} uploads under {}", entries.len(), prefix);
        Ok(entries)
    }

    /// Stores the record of an upload beside its blob.
    pub async fn record(&self, key: &StorageKey, record: &UploadRecord) -> Result<(), CatalogError> {
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| CatalogError::RecordEncoding(e.to_string()))?;

        self.blob_store
            .put(&key.record_key(), &json, "application/json")
            .await
            .map_err(|e| CatalogError::BlobStoreError(e.to_string()))?;
        Ok(())
    }

    /// A missing or unreadable record leaves the entry without one.
    async fn read_record(&self, upload_key: &str) -> Option<UploadRecord> {
        let record_key = record_key_for(upload_key);
        let data = match self.blob_store.get(&record_key).await {
            Ok(data) => data,
            Err(BlobStoreError::NotFound(_)) => return None,
            Err(e) => {
                tracing::warn!("Failed to read upload record {}: {}", record_key, e);
                return None;
            }
        };

        serde_json::from_slice(&data)
            .inspect_err(|e| tracing::warn!("Ignoring malformed upload record {}: {}", record_key, e))
            .ok()
    }

    /// Reads a blob through a link produced by [`DocumentCatalog::list`].
    pub async fn open(&self, key: &str, expires: i64, signature: &str) -> Result<Vec<u8>, CatalogError> {
        if expires < Utc::now().timestamp() || !self.blob_store.verify_signature(key, expires, signature) {
            return Err(CatalogError::InvalidLink);
        }

        self.blob_store.get(key).await.map_err(|e| match e {
            BlobStoreError::NotFound(key) | BlobStoreError::InvalidKey(key) => CatalogError::NotFound(key),
            other => CatalogError::BlobStoreError(other.to_string()),
        })
    }
}
