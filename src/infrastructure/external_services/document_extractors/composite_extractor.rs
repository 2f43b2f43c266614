use async_trait::async_trait;
use std::sync::Arc;

use super::PdfExtractor;
use crate::application::ports::document_extractor::{
    DocumentExtractionError, DocumentExtractor, ExtractedText, ExtractionMethod, essence,
};

/// Routes a document to the extractor for its media type.
///
/// PDFs go to the [`PdfExtractor`], `text/*` is decoded as UTF-8 and
/// everything else (photos, office files, unknown types) gets the
/// placeholder text instead of an error.
pub struct CompositeDocumentExtractor {
    pdf_extractor: Arc<PdfExtractor>,
}

impl CompositeDocumentExtractor {
    pub fn new(pdf_extractor: Arc<PdfExtractor>) -> Self {
        Self { pdf_extractor }
    }
}

fn is_plain_text(media_type: &str) -> bool {
    media_type.starts_with("text/")
}

#[async_trait]
impl DocumentExtractor for CompositeDocumentExtractor {
    async fn extract_text_from_bytes(
        &self,
        data: &[u8],
        media_type: &str,
    ) -> Result<ExtractedText, DocumentExtractionError> {
        let media_type = essence(media_type);

        if self.pdf_extractor.can_extract(&media_type) {
            return self
                .pdf_extractor
                .extract_text_from_bytes(data, &media_type)
                .await;
        }

        if is_plain_text(&media_type) {
            return Ok(ExtractedText {
                text: String::from_utf8_lossy(data).into_owned(),
                method: ExtractionMethod::PlainText,
                page_count: None,
            });
        }

        tracing::debug!("No extractor for {}, storing placeholder text", media_type);
        Ok(ExtractedText::skipped())
    }

    fn can_extract(&self, media_type: &str) -> bool {
        let media_type = essence(media_type);
        self.pdf_extractor.can_extract(&media_type) || is_plain_text(&media_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::document_extractor::NO_TEXT_EXTRACTED;

    fn extractor() -> CompositeDocumentExtractor {
        CompositeDocumentExtractor::new(Arc::new(PdfExtractor::new()))
    }

    #[tokio::test]
    async fn test_plain_text_is_decoded() {
        let extracted = extractor()
            .extract_text_from_bytes("Rent € 850".as_bytes(), "text/plain; charset=utf-8")
            .await
            .unwrap();

        assert_eq!(extracted.text, "Rent € 850");
        assert_eq!(extracted.method, ExtractionMethod::PlainText);
    }

    #[tokio::test]
    async fn test_images_get_the_placeholder() {
        let extracted = extractor()
            .extract_text_from_bytes(&[0x89, b'P', b'N', b'G'], "image/png")
            .await
            .unwrap();

        assert_eq!(extracted.text, NO_TEXT_EXTRACTED);
        assert_eq!(extracted.method, ExtractionMethod::Skipped);
    }

    #[tokio::test]
    async fn test_pdf_media_type_is_case_insensitive() {
        let pdf = super::super::pdf_extractor::test_pdf::pdf_with_pages(&["Quarterly VAT return"]);

        let extracted = extractor()
            .extract_text_from_bytes(&pdf, "Application/PDF")
            .await
            .unwrap();

        assert_eq!(extracted.method, ExtractionMethod::Direct);
        assert!(extracted.text.contains("Quarterly VAT return"));
    }

    #[test]
    fn test_can_extract() {
        let extractor = extractor();
        assert!(extractor.can_extract("application/pdf"));
        assert!(extractor.can_extract("text/csv"));
        assert!(!extractor.can_extract("image/jpeg"));
    }
}
