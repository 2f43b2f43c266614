//! Process configuration.
//!
//! Everything is read from environment variables (optionally seeded from a
//! `.env` file by the binary). Every setting has a default except
//! `DATABASE_URL`, which is required for the `postgres` storage backend.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::application::services::answer_composer::DEFAULT_MAX_CONTEXT_CHARS;
use crate::application::services::chunker::DEFAULT_CHUNK_SIZE;
use crate::application::services::document_catalog::DEFAULT_SIGNED_URL_TTL;
use crate::application::services::ingestion_pipeline::IngestionSettings;
use crate::application::services::report_generator::DEFAULT_MAX_REPORT_CHARS;
use crate::infrastructure::external_services::document_extractors::ocr::{
    DEFAULT_OCR_DPI, DEFAULT_OCR_LANGUAGE,
};
use crate::infrastructure::external_services::{ChatCompletionConfig, EmbeddingsClientConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {var} ({value}): {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub expose_error_details: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone)]
pub enum StorageBackend {
    Postgres(DatabaseConfig),
    Memory,
}

#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    pub upload_dir: PathBuf,
    pub public_base_url: Url,
    pub signing_secret: String,
    pub signed_url_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub max_upload_bytes: usize,
    pub enrich_documents: bool,
    pub call_timeout: Duration,
    pub extraction_timeout: Duration,
    pub max_context_chars: usize,
    pub max_report_chars: usize,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub enabled: bool,
    pub dpi: u32,
    pub language: String,
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageBackend,
    pub embeddings: EmbeddingsClientConfig,
    pub chat: ChatCompletionConfig,
    pub blob_store: BlobStoreConfig,
    pub pipeline: PipelineConfig,
    pub ocr: OcrConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let port = env.parse("PORT", 3000u16)?;
        let server = ServerConfig {
            port,
            expose_error_details: env.flag("EXPOSE_ERROR_DETAILS", false)?,
        };

        let storage = match env.get("STORAGE_BACKEND").as_deref() {
            None | Some("postgres") => StorageBackend::Postgres(DatabaseConfig {
                url: env.get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                pool_size: env.parse("DB_POOL_SIZE", 10u32)?,
            }),
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE_BACKEND",
                    value: other.to_string(),
                    reason: "expected `postgres` or `memory`".to_string(),
                });
            }
        };

        let call_timeout = Duration::from_secs(env.parse("EXTERNAL_CALL_TIMEOUT_SECS", 30u64)?);
        let api_key = env.get("OPENAI_API_KEY");

        let embedding_defaults = EmbeddingsClientConfig::default();
        let embeddings = EmbeddingsClientConfig {
            service_url: env
                .get("EMBEDDINGS_SERVICE_URL")
                .unwrap_or(embedding_defaults.service_url),
            api_key: env.get("EMBEDDINGS_API_KEY").or_else(|| api_key.clone()),
            model: env.get("EMBEDDING_MODEL").unwrap_or(embedding_defaults.model),
            dimension: env.parse("EMBEDDING_DIMENSION", embedding_defaults.dimension)?,
            timeout_secs: call_timeout.as_secs(),
            retry: embedding_defaults.retry,
        };

        let chat_defaults = ChatCompletionConfig::default();
        let chat = ChatCompletionConfig {
            service_url: env
                .get("CHAT_COMPLETIONS_URL")
                .unwrap_or(chat_defaults.service_url),
            api_key,
            model: env.get("CHAT_MODEL").unwrap_or(chat_defaults.model),
            temperature: chat_defaults.temperature,
            timeout_secs: call_timeout.as_secs().max(chat_defaults.timeout_secs),
            retry: chat_defaults.retry,
        };

        let public_base_url = env
            .get("BLOB_PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}/", port));
        let blob_store = BlobStoreConfig {
            upload_dir: PathBuf::from(env.get("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string())),
            public_base_url: Url::parse(&public_base_url).map_err(|e| ConfigError::Invalid {
                var: "BLOB_PUBLIC_BASE_URL",
                value: public_base_url.clone(),
                reason: e.to_string(),
            })?,
            signing_secret: match env.get("BLOB_SIGNING_SECRET") {
                Some(secret) => secret,
                None => {
                    tracing::warn!("BLOB_SIGNING_SECRET not set, signed URLs will not survive a restart");
                    uuid::Uuid::new_v4().to_string()
                }
            },
            signed_url_ttl: Duration::from_secs(
                env.parse("SIGNED_URL_TTL_SECS", DEFAULT_SIGNED_URL_TTL.as_secs())?,
            ),
        };

        let ingestion_defaults = IngestionSettings::default();
        let pipeline = PipelineConfig {
            chunk_size: env.positive("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            max_upload_bytes: env.positive("MAX_UPLOAD_BYTES", ingestion_defaults.max_upload_bytes)?,
            enrich_documents: env.flag("ENRICH_DOCUMENTS", ingestion_defaults.enrich_documents)?,
            call_timeout,
            extraction_timeout: Duration::from_secs(env.parse(
                "EXTRACTION_TIMEOUT_SECS",
                ingestion_defaults.extraction_timeout.as_secs(),
            )?),
            max_context_chars: env.positive("MAX_CONTEXT_CHARS", DEFAULT_MAX_CONTEXT_CHARS)?,
            max_report_chars: env.positive("MAX_REPORT_CHARS", DEFAULT_MAX_REPORT_CHARS)?,
        };

        let ocr = OcrConfig {
            enabled: env.flag("OCR_ENABLED", true)?,
            dpi: env.parse("OCR_DPI", DEFAULT_OCR_DPI)?,
            language: env
                .get("OCR_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_OCR_LANGUAGE.to_string()),
            scratch_dir: env.get("OCR_SCRATCH_DIR").map(PathBuf::from),
        };

        let logging = LoggingConfig {
            level: env.get("LOG_LEVEL").unwrap_or_else(|| LoggingConfig::default().level),
        };

        Ok(Self {
            server,
            storage,
            embeddings,
            chat,
            blob_store,
            pipeline,
            ocr,
            logging,
        })
    }

    /// Bound on one embedding call, long enough for the client's own retries.
    pub fn embedding_timeout(&self) -> Duration {
        self.embeddings.call_budget()
    }

    /// Bound on one completion, long enough for the client's own retries.
    pub fn generation_timeout(&self) -> Duration {
        self.chat.call_budget()
    }

    pub fn ingestion_settings(&self) -> IngestionSettings {
        IngestionSettings {
            max_upload_bytes: self.pipeline.max_upload_bytes,
            enrich_documents: self.pipeline.enrich_documents,
            call_timeout: self.pipeline.call_timeout,
            embedding_timeout: self.embedding_timeout(),
            extraction_timeout: self.pipeline.extraction_timeout,
        }
    }
}

struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(var) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn positive(&self, var: &'static str, default: usize) -> Result<usize, ConfigError> {
        let value = self.parse(var, default)?;
        if value == 0 {
            return Err(ConfigError::Invalid {
                var,
                value: value.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    }

    fn flag(&self, var: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.get(var).map(|v| v.to_lowercase()).as_deref() {
            None => Ok(default),
            Some("1" | "true" | "yes" | "on") => Ok(true),
            Some("0" | "false" | "no" | "off") => Ok(false),
            Some(other) => Err(ConfigError::Invalid {
                var,
                value: other.to_string(),
                reason: "expected a boolean".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_memory_backend() {
        let config = config(&[("STORAGE_BACKEND", "memory")]).unwrap();

        assert!(matches!(config.storage, StorageBackend::Memory));
        assert_eq!(config.server.port, 3000);
        assert!(!config.server.expose_error_details);
        assert_eq!(config.pipeline.chunk_size, 500);
        assert_eq!(config.pipeline.max_context_chars, 12_000);
        assert_eq!(config.pipeline.call_timeout, Duration::from_secs(30));
        assert_eq!(config.blob_store.signed_url_ttl, Duration::from_secs(3600));
        assert_eq!(config.blob_store.public_base_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.embeddings.dimension, 1536);
        assert_eq!(config.ocr.language, "eng");
        assert!(config.ocr.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_postgres_backend_requires_database_url() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("DATABASE_URL"))));

        let parsed = config(&[
            ("DATABASE_URL", "postgres://localhost/ledger"),
            ("DB_POOL_SIZE", "4"),
        ])
        .unwrap();
        match parsed.storage {
            StorageBackend::Postgres(db) => {
                assert_eq!(db.url, "postgres://localhost/ledger");
                assert_eq!(db.pool_size, 4);
            }
            StorageBackend::Memory => panic!("expected postgres"),
        }
    }

    #[test]
    fn test_api_key_falls_back_to_openai_key() {
        let shared = config(&[("STORAGE_BACKEND", "memory"), ("OPENAI_API_KEY", "sk-1")]).unwrap();
        assert_eq!(shared.embeddings.api_key.as_deref(), Some("sk-1"));
        assert_eq!(shared.chat.api_key.as_deref(), Some("sk-1"));

        let split = config(&[
            ("STORAGE_BACKEND", "memory"),
            ("OPENAI_API_KEY", "sk-1"),
            ("EMBEDDINGS_API_KEY", "sk-embed"),
        ])
        .unwrap();
        assert_eq!(split.embeddings.api_key.as_deref(), Some("sk-embed"));
        assert_eq!(split.chat.api_key.as_deref(), Some("sk-1"));
    }

    #[test]
    fn test_invalid_numbers_are_reported() {
        let error = config(&[("STORAGE_BACKEND", "memory"), ("CHUNK_SIZE", "lots")]).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { var: "CHUNK_SIZE", .. }));

        let error = config(&[("STORAGE_BACKEND", "memory"), ("CHUNK_SIZE", "0")]).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { var: "CHUNK_SIZE", .. }));

        let error = config(&[("STORAGE_BACKEND", "sqlite")]).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { var: "STORAGE_BACKEND", .. }));
    }

    #[test]
    fn test_flags_and_blank_values() {
        let config = config(&[
            ("STORAGE_BACKEND", "memory"),
            ("ENRICH_DOCUMENTS", "FALSE"),
            ("EXPOSE_ERROR_DETAILS", "1"),
            ("CHAT_MODEL", "   "),
        ])
        .unwrap();

        assert!(!config.pipeline.enrich_documents);
        assert!(config.server.expose_error_details);
        assert_eq!(config.chat.model, "gpt-4o-mini");
    }

    #[test]
    fn test_service_timeouts_outlast_the_client_retries() {
        let parsed = config(&[("STORAGE_BACKEND", "memory")]).unwrap();

        let per_completion = Duration::from_secs(parsed.chat.timeout_secs);
        assert_eq!(per_completion, Duration::from_secs(60));
        assert!(parsed.generation_timeout() > per_completion * (parsed.chat.retry.max_retries + 1));
        assert!(parsed.generation_timeout() > parsed.pipeline.call_timeout);

        let settings = parsed.ingestion_settings();
        let per_embedding = Duration::from_secs(parsed.embeddings.timeout_secs);
        assert!(settings.embedding_timeout > per_embedding * (parsed.embeddings.retry.max_retries + 1));
        assert_eq!(settings.call_timeout, parsed.pipeline.call_timeout);
    }
}
