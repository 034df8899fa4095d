//! Tesseract backend.
//!
//! Each page is written to a temporary PNG and recognised with
//! `tesseract <page.png> stdout -l <lang>`. The temp file is removed when
//! the call returns, whether it succeeded or not.

use crate::error::AnalyzerError;
use crate::ocr::OcrEngine;
use crate::pipeline::encode::encode_png;
use async_trait::async_trait;
use image::DynamicImage;
use std::io::Write;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TesseractEngine {
    cmd: String,
    lang: String,
}

impl TesseractEngine {
    /// `lang` is a `+`-joined list of traineddata names, e.g. `eng+deu`.
    pub fn new(cmd: impl Into<String>, lang: impl Into<String>) -> Self {
        let lang = lang.into();
        Self {
            cmd: cmd.into(),
            lang: if lang.trim().is_empty() {
                "eng".to_string()
            } else {
                lang
            },
        }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Run `tesseract --version`. Returns the first output line on success.
    pub async fn version(&self) -> Result<String, AnalyzerError> {
        let output = Command::new(&self.cmd)
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.missing(e))?;
        // Older releases print the version banner on stderr.
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    fn missing(&self, e: std::io::Error) -> AnalyzerError {
        AnalyzerError::DependencyMissing {
            dependency: "tesseract".to_string(),
            hint: format!(
                "Could not run '{}': {e}\n\
                 Install Tesseract (e.g. `apt install tesseract-ocr` or `brew install tesseract`) \
                 or set TESSERACT_CMD to its location.",
                self.cmd
            ),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn recognize(&self, page: &DynamicImage) -> Result<String, AnalyzerError> {
        let png = encode_png(page)?;
        let mut tmp = tempfile::Builder::new()
            .prefix("medical-analyzer-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| AnalyzerError::extraction_with("could not create temp page image", e))?;
        tmp.write_all(&png)
            .and_then(|_| tmp.flush())
            .map_err(|e| AnalyzerError::extraction_with("could not write temp page image", e))?;

        let output = Command::new(&self.cmd)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .output()
            .await
            .map_err(|e| self.missing(e))?;

        if !output.status.success() {
            return Err(AnalyzerError::extraction(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract recognised {} characters", text.chars().count());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn empty_language_defaults_to_english() {
        let engine = TesseractEngine::new("tesseract", "  ");
        assert_eq!(engine.lang(), "eng");
        assert_eq!(TesseractEngine::new("tesseract", "eng+deu").lang(), "eng+deu");
    }

    #[tokio::test]
    async fn missing_binary_is_a_missing_dependency() {
        let engine = TesseractEngine::new("/nonexistent/bin/tesseract-xyz", "eng");
        let page = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        let err = engine.recognize(&page).await.unwrap_err();
        assert!(
            matches!(&err, AnalyzerError::DependencyMissing { dependency, .. } if dependency == "tesseract")
        );
        assert!(engine.version().await.is_err());
    }
}
