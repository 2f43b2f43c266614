pub mod composite_extractor;
pub mod ocr;
pub mod pdf_extractor;

pub use composite_extractor::CompositeDocumentExtractor;
pub use ocr::{OcrFallback, PdftoppmRasterizer, TesseractOcrEngine};
pub use pdf_extractor::PdfExtractor;
