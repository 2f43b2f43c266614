use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::application::errors::{Classified, ErrorClass};
use crate::application::ports::text_generator::{ChatMessage, TextGenerator};
use crate::domain::repositories::ChunkSink;
use crate::domain::value_objects::Tenant;

pub const DEFAULT_MAX_REPORT_CHARS: usize = 48_000;

const REPORT_PROMPT: &str = "You are a Cyprus tax accountant. Generate a structured tax report for a client using only the provided text below.";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("No documents stored for {0}")]
    NoDocuments(String),
    #[error("Failed to read report chunks: {0}")]
    SinkError(String),
    #[error("Report generation failed: {0}")]
    GenerationFailed(String),
}

impl Classified for ReportError {
    fn class(&self) -> ErrorClass {
        match self {
            ReportError::NoDocuments(_) => ErrorClass::Input,
            ReportError::SinkError(_) | ReportError::GenerationFailed(_) => {
                ErrorClass::DependentService
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub text: String,
    /// Chunks whose text was sent to the generator.
    pub chunk_count: usize,
}

/// Builds a whole-client report from everything in the report sink.
pub struct ReportGenerator {
    report_sink: Arc<dyn ChunkSink>,
    text_generator: Arc<dyn TextGenerator>,
    max_report_chars: usize,
    call_timeout: Duration,
}

impl ReportGenerator {
    pub fn new(
        report_sink: Arc<dyn ChunkSink>,
        text_generator: Arc<dyn TextGenerator>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            report_sink,
            text_generator,
            max_report_chars: DEFAULT_MAX_REPORT_CHARS,
            call_timeout,
        }
    }

    pub fn with_max_report_chars(mut self, max_report_chars: usize) -> Self {
        self.max_report_chars = max_report_chars;
        self
    }

    pub async fn generate(&self, tenant: &Tenant) -> Result<Report, ReportError> {
        let chunks = self
            .report_sink
            .find_by_tenant(tenant)
            .await
            .map_err(|e| ReportError::SinkError(e.to_string()))?;

        if chunks.is_empty() {
            return Err(ReportError::NoDocuments(tenant.to_string()));
        }

        let mut material = String::new();
        let mut length = 0;
        let mut chunk_count = 0;
        for chunk in &chunks {
            let separator = if chunk_count == 0 { 0 } else { 1 };
            let chars = chunk.character_count();
            if length + separator + chars > self.max_report_chars {
                if chunk_count == 0 {
                    material.extend(chunk.sequence_text().chars().take(self.max_report_chars));
                    chunk_count = 1;
                }
                break;
            }
            if separator == 1 {
                material.push('\n');
            }
            material.push_str(chunk.sequence_text());
            length += separator + chars;
            chunk_count += 1;
        }

        tracing::info!(
            "Generating report for {} from {} of {} chunks",
            tenant,
            chunk_count,
            chunks.len()
        );

        let messages = [ChatMessage::system(REPORT_PROMPT), ChatMessage::user(material)];
        let text = tokio::time::timeout(self.call_timeout, self.text_generator.complete(&messages))
            .await
            .map_err(|_| {
                ReportError::GenerationFailed(format!(
                    "timed out after {}s",
                    self.call_timeout.as_secs()
                ))
            })?
            .map_err(|e| ReportError::GenerationFailed(e.to_string()))?;

        Ok(Report { text, chunk_count })
    }
}
