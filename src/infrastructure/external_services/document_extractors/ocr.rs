use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

use crate::application::ports::document_extractor::DocumentExtractionError;

pub const DEFAULT_OCR_DPI: u32 = 150;
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Renders PDF pages to images.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Writes one PNG per page into `out_dir` and returns them in page order.
    async fn rasterize(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
        dpi: u32,
    ) -> Result<Vec<PathBuf>, DocumentExtractionError>;
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image_path: &Path) -> Result<String, DocumentExtractionError>;
}

/// Children are killed when the future awaiting them is dropped, so a timed
/// out or cancelled extraction leaves no process behind.
fn tool_command(program: &str) -> Command {
    let mut command = Command::new(program);
    command.kill_on_drop(true);
    command
}

/// `pdftoppm` from poppler-utils.
pub struct PdftoppmRasterizer;

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn rasterize(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
        dpi: u32,
    ) -> Result<Vec<PathBuf>, DocumentExtractionError> {
        let output = tool_command("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg(pdf_path)
            .arg(out_dir.join("page"))
            .output()
            .await
            .map_err(|e| DocumentExtractionError::OcrFailed(format!("pdftoppm failed: {}", e)))?;

        if !output.status.success() {
            return Err(DocumentExtractionError::OcrFailed(format!(
                "pdftoppm error: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut entries = tokio::fs::read_dir(out_dir)
            .await
            .map_err(|e| DocumentExtractionError::IoError(e.to_string()))?;
        let mut pages = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DocumentExtractionError::IoError(e.to_string()))?
        {
            let path = entry.path();
            if let Some(number) = page_number(&path) {
                pages.push((number, path));
            }
        }

        if pages.is_empty() {
            return Err(DocumentExtractionError::OcrFailed(
                "pdftoppm produced no images".to_string(),
            ));
        }

        pages.sort_by_key(|(number, _)| *number);
        Ok(pages.into_iter().map(|(_, path)| path).collect())
    }
}

/// `page-7.png` and `page-07.png` are both page 7.
fn page_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("page-")?
        .parse()
        .ok()
}

/// The `tesseract` command line, printing recognised text to stdout.
pub struct TesseractOcrEngine {
    language: String,
}

impl TesseractOcrEngine {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }
}

impl Default for TesseractOcrEngine {
    fn default() -> Self {
        Self::new(DEFAULT_OCR_LANGUAGE)
    }
}

#[async_trait]
impl OcrEngine for TesseractOcrEngine {
    async fn recognize(&self, image_path: &Path) -> Result<String, DocumentExtractionError> {
        let output = tool_command("tesseract")
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await
            .map_err(|e| DocumentExtractionError::OcrFailed(format!("tesseract failed: {}", e)))?;

        if !output.status.success() {
            return Err(DocumentExtractionError::OcrFailed(format!(
                "tesseract error on {}: {}",
                image_path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Recognises the pages of an image-only PDF.
///
/// All intermediate files live in one temporary directory that is removed
/// when extraction returns, whether it succeeded or not.
pub struct OcrFallback {
    rasterizer: Arc<dyn PageRasterizer>,
    engine: Arc<dyn OcrEngine>,
    dpi: u32,
    scratch_root: Option<PathBuf>,
}

impl OcrFallback {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            rasterizer,
            engine,
            dpi: DEFAULT_OCR_DPI,
            scratch_root: None,
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Creates temporary directories under `root` instead of the system
    /// temp dir.
    pub fn with_scratch_root(mut self, root: PathBuf) -> Self {
        self.scratch_root = Some(root);
        self
    }

    /// Returns the page texts joined by a blank line, and the page count.
    pub async fn extract(&self, pdf: &[u8]) -> Result<(String, usize), DocumentExtractionError> {
        let scratch = match &self.scratch_root {
            Some(root) => tempfile::Builder::new().prefix("ocr-").tempdir_in(root),
            None => tempfile::Builder::new().prefix("ocr-").tempdir(),
        }
        .map_err(|e| DocumentExtractionError::IoError(e.to_string()))?;

        let pdf_path = scratch.path().join("input.pdf");
        tokio::fs::write(&pdf_path, pdf)
            .await
            .map_err(|e| DocumentExtractionError::IoError(e.to_string()))?;

        let pages = self
            .rasterizer
            .rasterize(&pdf_path, scratch.path(), self.dpi)
            .await?;

        let mut texts = Vec::with_capacity(pages.len());
        for page in &pages {
            let text = self.engine.recognize(page).await?;
            texts.push(text.trim().to_string());
        }

        tracing::info!("OCR recognised {} pages at {} dpi", pages.len(), self.dpi);

        // `scratch` is dropped here and on every early return above.
        Ok((texts.join("\n\n"), pages.len()))
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::Mutex;

    /// Writes `pages` empty PNG files, like `pdftoppm` would.
    pub struct FakeRasterizer {
        pub pages: usize,
    }

    #[async_trait]
    impl PageRasterizer for FakeRasterizer {
        async fn rasterize(
            &self,
            _pdf_path: &Path,
            out_dir: &Path,
            _dpi: u32,
        ) -> Result<Vec<PathBuf>, DocumentExtractionError> {
            let mut paths = Vec::new();
            for page in 1..=self.pages {
                let path = out_dir.join(format!("page-{}.png", page));
                std::fs::write(&path, b"png").unwrap();
                paths.push(path);
            }
            Ok(paths)
        }
    }

    /// Answers `text of page-N` and records every image it was given.
    #[derive(Default)]
    pub struct RecordingOcrEngine {
        pub seen: Mutex<Vec<PathBuf>>,
        pub fail_on_page: Option<usize>,
    }

    #[async_trait]
    impl OcrEngine for RecordingOcrEngine {
        async fn recognize(&self, image_path: &Path) -> Result<String, DocumentExtractionError> {
            let mut seen = self.seen.lock().unwrap();
            seen.push(image_path.to_path_buf());
            if Some(seen.len()) == self.fail_on_page {
                return Err(DocumentExtractionError::OcrFailed("unreadable".to_string()));
            }
            let stem = image_path.file_stem().unwrap().to_string_lossy().into_owned();
            Ok(format!("text of {}\n", stem))
        }
    }
}
