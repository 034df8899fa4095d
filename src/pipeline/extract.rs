//! Text extraction: the document's own text layer first, page OCR second.
//!
//! Digitally produced reports carry a text layer that `lopdf` can read in
//! milliseconds. Scans do not, or carry only a few stray characters, so when
//! the direct result is not longer than [`MIN_MEANINGFUL_CHARS`] the pages
//! are rasterised and handed to the configured [`OcrEngine`] one by one.
//!
//! Both paths join per-page text with a blank line, in page order.

use crate::error::AnalyzerError;
use crate::ocr::OcrEngine;
use crate::pipeline::input;
use crate::pipeline::render::{self, PageRasterizer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Direct extraction must yield more characters than this to skip OCR.
pub const MIN_MEANINGFUL_CHARS: usize = 100;

/// Separator placed between the text of consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Produces one string of document text from a PDF path.
#[derive(Clone)]
pub struct TextExtractor {
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    min_chars: usize,
    max_rendered_pixels: u32,
}

impl fmt::Debug for TextExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextExtractor")
            .field("ocr", &self.ocr.name())
            .field("min_chars", &self.min_chars)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .finish_non_exhaustive()
    }
}

impl TextExtractor {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            rasterizer,
            ocr,
            min_chars: MIN_MEANINGFUL_CHARS,
            max_rendered_pixels: 2000,
        }
    }

    pub fn with_min_chars(mut self, n: usize) -> Self {
        self.min_chars = n;
        self
    }

    pub fn with_max_rendered_pixels(mut self, px: u32) -> Self {
        self.max_rendered_pixels = px;
        self
    }

    /// Extract the document text.
    ///
    /// `path` must name an existing, readable PDF; otherwise this fails with
    /// [`AnalyzerError::DocumentNotFound`] or
    /// [`AnalyzerError::UnsupportedFormat`] before anything is read. A text layer that lopdf cannot parse is treated like an empty one and
    /// the OCR path is taken. A document whose OCR pass finds no pages yields
    /// an empty string rather than an error.
    pub async fn extract(&self, path: &Path) -> Result<String, AnalyzerError> {
        input::validate_document(path)?;

        let owned: PathBuf = path.to_path_buf();
        let direct = tokio::task::spawn_blocking(move || extract_text_layer(&owned))
            .await
            .map_err(|e| AnalyzerError::Internal(format!("Extraction task panicked: {}", e)))?;

        match direct {
            Ok(text) if is_meaningful(&text, self.min_chars) => {
                info!(
                    "Extracted {} characters from the text layer of {}",
                    text.chars().count(),
                    path.display()
                );
                return Ok(text);
            }
            Ok(text) => warn!(
                "Text layer has {} characters (need more than {}), falling back to OCR",
                text.chars().count(),
                self.min_chars
            ),
            Err(e) => warn!(
                "Could not read the text layer of {}: {}. Falling back to OCR.",
                path.display(),
                e
            ),
        }

        self.ocr_document(path).await
    }

    async fn ocr_document(&self, path: &Path) -> Result<String, AnalyzerError> {
        let pages = render::render_pages(&self.rasterizer, path, self.max_rendered_pixels).await?;
        let total = pages.len();

        let mut parts = Vec::with_capacity(total);
        for (idx, page) in pages.iter().enumerate() {
            info!("Processing page {}/{} with {}", idx + 1, total, self.ocr.name());
            let text = self.ocr.recognize(page).await.map_err(|e| match e {
                AnalyzerError::DependencyMissing { .. } | AnalyzerError::ExtractionFailure { .. } => e,
                other => AnalyzerError::extraction(format!(
                    "{} failed on page {}: {}",
                    self.ocr.name(),
                    idx + 1,
                    other
                )),
            })?;
            parts.push(text);
        }

        let text = parts.join(PAGE_SEPARATOR);
        info!(
            "Extracted {} characters from {} using {}",
            text.chars().count(),
            path.display(),
            self.ocr.name()
        );
        Ok(text)
    }
}

/// True when direct extraction produced enough text to skip OCR.
pub fn is_meaningful(text: &str, min_chars: usize) -> bool {
    text.chars().count() > min_chars
}

/// Read the embedded text of every page, in page order.
pub fn extract_text_layer(path: &Path) -> Result<String, AnalyzerError> {
    let doc = lopdf::Document::load(path).map_err(|e| {
        AnalyzerError::extraction_with(format!("lopdf could not parse '{}'", path.display()), e)
    })?;

    let mut parts = Vec::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => parts.push(text),
            Err(e) => {
                debug!("No text on page {}: {}", page_num, e);
                parts.push(String::new());
            }
        }
    }
    Ok(parts.join(PAGE_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{DynamicImage, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TwoPages(AtomicUsize);

    impl PageRasterizer for TwoPages {
        fn render_pages(&self, _: &Path, _: u32) -> Result<Vec<DynamicImage>, AnalyzerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec![DynamicImage::ImageRgba8(RgbaImage::new(4, 4)); 2])
        }
    }

    struct EchoOcr(AtomicUsize);

    #[async_trait]
    impl OcrEngine for EchoOcr {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn recognize(&self, _: &DynamicImage) -> Result<String, AnalyzerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("ocr".to_string())
        }
    }

    fn extractor() -> (TextExtractor, Arc<TwoPages>, Arc<EchoOcr>) {
        let rasterizer = Arc::new(TwoPages(AtomicUsize::new(0)));
        let ocr = Arc::new(EchoOcr(AtomicUsize::new(0)));
        (
            TextExtractor::new(rasterizer.clone(), ocr.clone()),
            rasterizer,
            ocr,
        )
    }

    #[tokio::test]
    async fn missing_path_is_rejected_before_rendering() {
        let (extractor, rasterizer, ocr) = extractor();
        let err = extractor
            .extract(Path::new("/nonexistent/report.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::DocumentNotFound { .. }));
        assert_eq!(rasterizer.0.load(Ordering::SeqCst), 0);
        assert_eq!(ocr.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_pdf_path_is_rejected_before_rendering() {
        let dir = tempfile::TempDir::new().unwrap();
        let p = dir.path().join("notes.txt");
        std::fs::write(&p, b"Patient: Jane Doe").unwrap();

        let (extractor, rasterizer, _) = extractor();
        assert!(matches!(
            extractor.extract(&p).await.unwrap_err(),
            AnalyzerError::UnsupportedFormat { .. }
        ));
        assert_eq!(rasterizer.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreadable_text_layer_goes_through_ocr() {
        let dir = tempfile::TempDir::new().unwrap();
        let p = dir.path().join("scan.pdf");
        std::fs::write(&p, b"%PDF-1.5\nno objects here").unwrap();

        let (extractor, rasterizer, ocr) = extractor();
        assert_eq!(extractor.extract(&p).await.unwrap(), "ocr\n\nocr");
        assert_eq!(rasterizer.0.load(Ordering::SeqCst), 1);
        assert_eq!(ocr.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn threshold_is_strictly_greater() {
        let exactly = "x".repeat(MIN_MEANINGFUL_CHARS);
        assert!(!is_meaningful(&exactly, MIN_MEANINGFUL_CHARS));
        let over = "x".repeat(MIN_MEANINGFUL_CHARS + 1);
        assert!(is_meaningful(&over, MIN_MEANINGFUL_CHARS));
    }

    #[test]
    fn threshold_counts_chars_not_bytes() {
        // 60 two-byte characters: 120 bytes but only 60 chars.
        let text = "é".repeat(60);
        assert!(!is_meaningful(&text, MIN_MEANINGFUL_CHARS));
    }

    #[test]
    fn unparsable_file_is_an_extraction_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let p = dir.path().join("broken.pdf");
        std::fs::write(&p, b"%PDF-1.5\nnot really a pdf").unwrap();
        assert!(matches!(
            extract_text_layer(&p).unwrap_err(),
            AnalyzerError::ExtractionFailure { .. }
        ));
    }
}
