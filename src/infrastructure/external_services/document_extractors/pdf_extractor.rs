use async_trait::async_trait;
use lopdf::Document;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::ocr::OcrFallback;
use crate::application::ports::document_extractor::{
    DocumentExtractionError, DocumentExtractor, ExtractedText, ExtractionMethod,
};

/// Direct extraction yielding fewer trimmed characters than this is treated
/// as an image-only PDF.
pub const MIN_DIRECT_TEXT_CHARS: usize = 10;

pub struct PdfExtractor {
    password: String,
    ocr: Option<Arc<OcrFallback>>,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self {
            password: String::new(),
            ocr: None,
        }
    }

    pub fn with_ocr(mut self, ocr: Arc<OcrFallback>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Page texts in page order, joined by a blank line. Pages that fail to
    /// extract count as empty.
    fn extract_pdf_text(doc: &Document) -> (String, usize) {
        let pages = doc.get_pages();
        let page_count = pages.len();

        let extracted_pages: BTreeMap<u32, String> = pages
            .into_par_iter()
            .map(|(page_num, _): (u32, (u32, u16))| {
                let text = match doc.extract_text(&[page_num]) {
                    Ok(text) => text
                        .split('\n')
                        .map(|s| s.trim_end())
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                        .join("\n"),
                    Err(e) => {
                        tracing::warn!("Failed to extract text from page {}: {}", page_num, e);
                        String::new()
                    }
                };
                (page_num, text)
            })
            .collect();

        let combined = extracted_pages
            .into_values()
            .collect::<Vec<_>>()
            .join("\n\n");

        (combined, page_count)
    }

    async fn extract_direct(&self, data: &[u8]) -> Result<(String, usize), DocumentExtractionError> {
        let data = data.to_vec();
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || -> Result<(String, usize), DocumentExtractionError> {
            let mut doc = Document::load_mem(&data)
                .map_err(|e| DocumentExtractionError::CorruptedFile(e.to_string()))?;

            if doc.is_encrypted() {
                doc.decrypt(&password).map_err(|_e| {
                    DocumentExtractionError::CorruptedFile(
                        "Failed to decrypt PDF - invalid password".to_string(),
                    )
                })?;
            }

            Ok(Self::extract_pdf_text(&doc))
        })
        .await
        .map_err(|e| DocumentExtractionError::IoError(format!("Extraction task failed: {}", e)))?
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_insufficient(text: &str) -> bool {
    text.trim().chars().count() < MIN_DIRECT_TEXT_CHARS
}

#[async_trait]
impl DocumentExtractor for PdfExtractor {
    async fn extract_text_from_bytes(
        &self,
        data: &[u8],
        _media_type: &str,
    ) -> Result<ExtractedText, DocumentExtractionError> {
        let (text, page_count) = self.extract_direct(data).await?;

        if !is_insufficient(&text) {
            return Ok(ExtractedText {
                text,
                method: ExtractionMethod::Direct,
                page_count: Some(page_count),
            });
        }

        let Some(ocr) = &self.ocr else {
            tracing::warn!("PDF has no usable text layer and OCR is disabled");
            return Ok(ExtractedText {
                text,
                method: ExtractionMethod::Direct,
                page_count: Some(page_count),
            });
        };

        tracing::info!(
            "Direct extraction gave {} chars over {} pages, falling back to OCR",
            text.trim().chars().count(),
            page_count
        );
        let (text, page_count) = ocr.extract(data).await?;

        Ok(ExtractedText {
            text,
            method: ExtractionMethod::Ocr,
            page_count: Some(page_count),
        })
    }

    fn can_extract(&self, media_type: &str) -> bool {
        media_type.to_lowercase() == "application/pdf"
    }
}

#[cfg(test)]
pub(crate) mod test_pdf {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    /// A minimal PDF with one page per entry; an empty entry is a page
    /// without any text operators.
    pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}
