use async_trait::async_trait;
use serde::Serialize;

/// Returned in place of text for media that is not a document (photos, scans
/// uploaded as images, unknown types).
pub const NO_TEXT_EXTRACTED: &str = "[no text extracted]";

#[derive(Debug, thiserror::Error)]
pub enum DocumentExtractionError {
    #[error("Corrupted file: {0}")]
    CorruptedFile(String),
    #[error("OCR failed: {0}")]
    OcrFailed(String),
    #[error("IO error: {0}")]
    IoError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Text layer read straight from the document.
    Direct,
    /// Pages rendered to images and recognised.
    Ocr,
    PlainText,
    /// Not a document format; the placeholder text was returned.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub method: ExtractionMethod,
    pub page_count: Option<usize>,
}

impl ExtractedText {
    pub fn skipped() -> Self {
        Self {
            text: NO_TEXT_EXTRACTED.to_string(),
            method: ExtractionMethod::Skipped,
            page_count: None,
        }
    }
}

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract_text_from_bytes(
        &self,
        data: &[u8],
        media_type: &str,
    ) -> Result<ExtractedText, DocumentExtractionError>;

    fn can_extract(&self, media_type: &str) -> bool;
}

/// Lower-cased `type/subtype` without parameters such as `; charset=utf-8`.
pub fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_essence_strips_parameters() {
        assert_eq!(essence("Text/Plain; charset=UTF-8"), "text/plain");
        assert_eq!(essence("application/pdf"), "application/pdf");
        assert_eq!(essence(""), "");
    }
}
