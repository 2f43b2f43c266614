use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use url::Url;

use crate::application::ports::blob_store::{BlobEntry, BlobStore, BlobStoreError, StoredBlob};

/// Blob store on the local filesystem. A key `a/b/c` is stored at
/// `base_path/a/b/c`; signed URLs point at `public_base_url/files/a/b/c`.
pub struct LocalBlobStore {
    base_path: PathBuf,
    public_base_url: Url,
    signing_secret: String,
}

impl LocalBlobStore {
    pub fn new(base_path: PathBuf, public_base_url: Url, signing_secret: String) -> Self {
        Self {
            base_path,
            public_base_url,
            signing_secret,
        }
    }

    pub async fn ensure_directory_exists(&self) -> Result<(), BlobStoreError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| BlobStoreError::IoError(e.to_string()))
    }

    fn get_blob_path(&self, key: &str) -> Result<PathBuf, BlobStoreError> {
        let relative = Path::new(key);
        let is_clean = !key.is_empty()
            && key.split('/').all(|segment| !segment.is_empty())
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_clean {
            return Err(BlobStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(relative))
    }

    /// HMAC-SHA256 over `key` and `expires`, keyed by the signing secret.
    fn mac(&self, key: &str, expires: i64) -> Result<Hmac<Sha256>, BlobStoreError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.signing_secret.as_bytes())
            .map_err(|e| BlobStoreError::SigningError(e.to_string()))?;
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }

    fn signature(&self, key: &str, expires: i64) -> Result<String, BlobStoreError> {
        let digest = self.mac(key, expires)?.finalize().into_bytes();
        Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    async fn collect_entries(
        &self,
        dir: PathBuf,
        entries_out: &mut Vec<BlobEntry>,
    ) -> Result<(), BlobStoreError> {
        let mut pending = vec![dir];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(BlobStoreError::IoError(e.to_string())),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| BlobStoreError::IoError(e.to_string()))?
            {
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| BlobStoreError::IoError(e.to_string()))?;
                let path = entry.path();

                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let metadata = entry
                        .metadata()
                        .await
                        .map_err(|e| BlobStoreError::IoError(e.to_string()))?;
                    let Ok(relative) = path.strip_prefix(&self.base_path) else {
                        continue;
                    };
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");

                    entries_out.push(BlobEntry {
                        key,
                        size: metadata.len(),
                        last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                    });
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<StoredBlob, BlobStoreError> {
        let blob_path = self.get_blob_path(key)?;
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobStoreError::IoError(e.to_string()))?;
        }

        fs::write(&blob_path, data)
            .await
            .map_err(|e| BlobStoreError::IoError(e.to_string()))?;

        Ok(StoredBlob {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: Some(content_type.to_string()),
        })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, BlobStoreError> {
        // Walk only the deepest directory the prefix fully names.
        let start = match prefix.rsplit_once('/') {
            Some((dir, _)) if !dir.is_empty() => self.get_blob_path(dir)?,
            _ => self.base_path.clone(),
        };

        let mut entries = Vec::new();
        self.collect_entries(start, &mut entries).await?;

        entries.retain(|entry| entry.key.starts_with(prefix));
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobStoreError> {
        let blob_path = self.get_blob_path(key)?;

        match fs::read(&blob_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobStoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(BlobStoreError::IoError(e.to_string())),
        }
    }

    async fn sign_url(&self, key: &str, ttl: Duration) -> Result<String, BlobStoreError> {
        self.get_blob_path(key)?;

        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| BlobStoreError::SigningError(e.to_string()))?;
        let expires = (Utc::now() + ttl).timestamp();

        let mut url = self.public_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BlobStoreError::SigningError(format!(
                    "Public base URL cannot carry a path: {}",
                    self.public_base_url
                ))
            })?
            .pop_if_empty()
            .push("files")
            .extend(key.split('/'));
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &self.signature(key, expires)?);

        Ok(url.to_string())
    }

    fn verify_signature(&self, key: &str, expires: i64, signature: &str) -> bool {
        let (Some(claimed), Ok(mac)) = (decode_hex(signature), self.mac(key, expires)) else {
            return false;
        };
        mac.verify_slice(&claimed).is_ok()
    }
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> LocalBlobStore {
        LocalBlobStore::new(
            dir.to_path_buf(),
            Url::parse("http://localhost:3000/").unwrap(),
            "secret".to_string(),
        )
    }

    #[tokio::test]
    async fn test_put_then_list_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store.put("acc1/acme/1-a.pdf", b"one", "application/pdf").await.unwrap();
        store.put("acc1/globex/2-b.pdf", b"two!", "application/pdf").await.unwrap();
        store.put("acc10/acme/3-c.pdf", b"3", "application/pdf").await.unwrap();

        let all = store.list("acc1/").await.unwrap();
        let keys: Vec<&str> = all.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["acc1/acme/1-a.pdf", "acc1/globex/2-b.pdf"]);
        assert_eq!(all[1].size, 4);

        let client = store.list("acc1/acme/").await.unwrap();
        assert_eq!(client.len(), 1);
        assert_eq!(store.get("acc1/acme/1-a.pdf").await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn test_listing_an_unknown_prefix_is_empty() {
        let dir = tempfile::tempdir().unwrap();

        assert!(store(dir.path()).list("nobody/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keys_cannot_escape_the_base_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        for key in ["../outside", "/etc/passwd", "a//b", ""] {
            let result = store.put(key, b"x", "text/plain").await;
            assert!(matches!(result, Err(BlobStoreError::InvalidKey(_))), "{key}");
        }
    }

    #[tokio::test]
    async fn test_signed_url_round_trips_through_verification() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let signed = store
            .sign_url("acc1/acme/1-a.pdf", Duration::from_secs(3600))
            .await
            .unwrap();
        let url = Url::parse(&signed).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        let expires: i64 = pairs["expires"].parse().unwrap();

        assert_eq!(url.path(), "/files/acc1/acme/1-a.pdf");
        assert!(expires > Utc::now().timestamp());
        assert!(store.verify_signature("acc1/acme/1-a.pdf", expires, &pairs["signature"]));
        assert!(!store.verify_signature("acc1/acme/other.pdf", expires, &pairs["signature"]));
        assert!(!store.verify_signature("acc1/acme/1-a.pdf", expires + 1, &pairs["signature"]));
    }

    #[tokio::test]
    async fn test_signatures_depend_on_the_secret() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let other = LocalBlobStore::new(
            dir.path().to_path_buf(),
            Url::parse("http://localhost:3000/").unwrap(),
            "another secret".to_string(),
        );
        let key = "acc1/acme/1-a.pdf";

        let signature = store.signature(key, 1_900_000_000).unwrap();

        assert_eq!(signature.len(), 64);
        assert!(store.verify_signature(key, 1_900_000_000, &signature));
        assert!(!other.verify_signature(key, 1_900_000_000, &signature));
        let mut tampered = signature.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert!(!store.verify_signature(key, 1_900_000_000, &tampered));
        assert!(!store.verify_signature(key, 1_900_000_000, &signature[..63]));
        assert!(!store.verify_signature(key, 1_900_000_000, ""));
    }
}
