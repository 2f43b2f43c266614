use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

use super::Tenant;

/// Name of one upload inside a tenant: `{millis}-{original name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceFilename(String);

impl SourceFilename {
    pub fn new(timestamp_millis: i64, original_name: &str) -> Result<Self, String> {
        let sanitized = sanitize_original_name(original_name);
        if sanitized.is_empty() {
            return Err("Original filename cannot be empty".to_string());
        }

        Ok(Self(format!("{}-{}", timestamp_millis, sanitized)))
    }

    /// Wraps a value that was already produced by [`SourceFilename::new`],
    /// e.g. when reading rows back from a sink.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn timestamp_millis(&self) -> Option<i64> {
        self.0.split_once('-').and_then(|(ts, _)| ts.parse().ok())
    }
}

impl std::fmt::Display for SourceFilename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SourceFilename> for String {
    fn from(name: SourceFilename) -> Self {
        name.0
    }
}

fn sanitize_original_name(original_name: &str) -> String {
    original_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

/// Hands out strictly increasing millisecond timestamps, so two uploads
/// stamped by the same clock never share a prefix.
#[derive(Debug, Default)]
pub struct MonotonicMillis {
    last: AtomicI64,
}

impl MonotonicMillis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = if now > previous { now } else { previous + 1 };
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => previous = actual,
            }
        }
    }
}

/// Blob store namespace of upload records. Tenant segments cannot start with
/// a dot, so no upload key ever falls under it.
pub const RECORD_PREFIX: &str = ".records/";

/// Blob store key of an upload: `{accountant}/{client}/{source_filename}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn for_upload(tenant: &Tenant, source_filename: &SourceFilename) -> Self {
        Self(format!(
            "{}/{}/{}",
            tenant.accountant(),
            tenant.client(),
            source_filename
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the JSON [`UploadRecord`](crate::domain::entities::UploadRecord)
    /// kept for this upload.
    pub fn record_key(&self) -> String {
        record_key_for(&self.0)
    }
}

pub fn record_key_for(upload_key: &str) -> String {
    format!("{}{}.json", RECORD_PREFIX, upload_key)
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_filename_is_timestamp_prefixed() {
        let name = SourceFilename::new(1_700_000_000_000, "invoice march.pdf").unwrap();
        assert_eq!(name.as_str(), "1700000000000-invoice march.pdf");
        assert_eq!(name.timestamp_millis(), Some(1_700_000_000_000));
    }

    #[test]
    fn test_path_separators_are_replaced() {
        let name = SourceFilename::new(1, "../../etc/passwd").unwrap();
        assert_eq!(name.as_str(), "1-_.._etc_passwd");
        assert!(!name.as_str().contains('/'));
    }

    #[test]
    fn test_record_key_lives_outside_tenant_prefixes() {
        let tenant = Tenant::new("maria", "acme").unwrap();
        let name = SourceFilename::new(5, "a.pdf").unwrap();

        let key = StorageKey::for_upload(&tenant, &name);

        assert_eq!(key.record_key(), ".records/maria/acme/5-a.pdf.json");
        assert!(!key.record_key().starts_with("maria/"));
    }

    #[test]
    fn test_blank_original_name_is_rejected() {
        assert!(SourceFilename::new(1, "   ").is_err());
    }

    #[test]
    fn test_monotonic_clock_never_repeats() {
        let clock = MonotonicMillis::new();
        let stamps: Vec<i64> = (0..1000).map(|_| clock.next()).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_storage_key_layout() {
        let tenant = Tenant::new("maria", "acme").unwrap();
        let name = SourceFilename::new(42, "w2.pdf").unwrap();
        assert_eq!(
            StorageKey::for_upload(&tenant, &name).as_str(),
            "maria/acme/42-w2.pdf"
        );
    }
}
