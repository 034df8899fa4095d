//! OCR engines for pages without a usable text layer.
//!
//! An engine turns one rasterised page into plain text. Two backends ship
//! with the crate:
//!
//! - [`tesseract::TesseractEngine`] drives the `tesseract` command-line tool
//! - [`paddle::PaddleEngine`] posts pages to a PaddleOCR serving endpoint
//!
//! Which one is used is a configuration choice ([`OcrEngineKind`]); callers
//! can also inject their own implementation through
//! [`crate::config::AnalyzerConfigBuilder::ocr`].

pub mod paddle;
pub mod tesseract;

use crate::config::{AnalyzerConfig, OcrEngineKind};
use crate::error::AnalyzerError;
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;

/// Recognises the text on one page image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Recognise the text on `page`. An unavailable engine reports
    /// [`AnalyzerError::DependencyMissing`].
    async fn recognize(&self, page: &DynamicImage) -> Result<String, AnalyzerError>;
}

/// Build the engine named by `config.ocr_engine`.
pub fn select_engine(config: &AnalyzerConfig) -> Result<Arc<dyn OcrEngine>, AnalyzerError> {
    let engine: Arc<dyn OcrEngine> = match config.ocr_engine {
        OcrEngineKind::Tesseract => Arc::new(tesseract::TesseractEngine::new(
            config.tesseract_cmd.clone(),
            config.tesseract_lang.clone(),
        )),
        OcrEngineKind::Paddle => Arc::new(paddle::PaddleEngine::new(config.paddle_url.clone())?),
    };
    Ok(engine)
}
