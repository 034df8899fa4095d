//! Dependency report for the configured OCR engine, PDF renderer and
//! model backend.
//!
//! Nothing here processes a document. The report answers "would a run
//! work on this machine?" and is what `medical-analyzer --check` prints.

use crate::config::{AnalyzerConfig, OcrEngineKind};
use crate::ocr::tesseract::TesseractEngine;
use crate::pipeline::llm::ModelClients;
use crate::pipeline::render::PdfiumRasterizer;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComponentStatus::Ok => "ok",
            ComponentStatus::Warning => "warning",
            ComponentStatus::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentReport {
    pub status: ComponentStatus,
    /// Engine, library or backend that was probed.
    pub name: String,
    pub detail: String,
}

impl ComponentReport {
    fn new(status: ComponentStatus, name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            name: name.into(),
            detail: detail.into(),
        }
    }
}

/// Outcome of [`check_dependencies`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemStatus {
    /// Worst status across all components.
    pub status: ComponentStatus,
    pub ocr: ComponentReport,
    pub pdf: ComponentReport,
    pub llm: ComponentReport,
    /// One line per non-ok component.
    pub warnings: Vec<String>,
}

impl SystemStatus {
    fn from_components(ocr: ComponentReport, pdf: ComponentReport, llm: ComponentReport) -> Self {
        let status = [ocr.status, pdf.status, llm.status]
            .into_iter()
            .max()
            .unwrap_or(ComponentStatus::Ok);
        let warnings = [&ocr, &pdf, &llm]
            .into_iter()
            .filter(|c| c.status != ComponentStatus::Ok)
            .map(|c| format!("{} ({}): {}", c.name, c.status, c.detail))
            .collect();
        Self {
            status,
            ocr,
            pdf,
            llm,
            warnings,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ComponentStatus::Ok
    }
}

/// Probe every external dependency the configuration relies on.
///
/// Injected collaborators in `config` are reported as ok without probing.
pub async fn check_dependencies(config: &AnalyzerConfig) -> SystemStatus {
    let ocr = check_ocr(config).await;
    let pdf = check_pdfium(config).await;
    let llm = check_llm(config);
    let status = SystemStatus::from_components(ocr, pdf, llm);
    info!("Dependency check finished: {}", status.status);
    status
}

async fn check_ocr(config: &AnalyzerConfig) -> ComponentReport {
    if let Some(engine) = &config.ocr {
        return ComponentReport::new(ComponentStatus::Ok, engine.name(), "injected engine");
    }
    match config.ocr_engine {
        OcrEngineKind::Tesseract => {
            let engine = TesseractEngine::new(config.tesseract_cmd.clone(), config.tesseract_lang.clone());
            match engine.version().await {
                Ok(version) => {
                    debug!("Tesseract version: {}", version);
                    ComponentReport::new(ComponentStatus::Ok, "tesseract", version)
                }
                Err(_) => ComponentReport::new(
                    ComponentStatus::Error,
                    "tesseract",
                    format!(
                        "Tesseract binary not found at: {}. Install from https://github.com/tesseract-ocr/tesseract",
                        config.tesseract_cmd
                    ),
                ),
            }
        }
        OcrEngineKind::Paddle => check_paddle(config.paddle_url.as_deref()).await,
    }
}

async fn check_paddle(url: Option<&str>) -> ComponentReport {
    let Some(url) = url else {
        return ComponentReport::new(
            ComponentStatus::Error,
            "paddle",
            "no PaddleOCR server URL configured (PADDLE_OCR_URL)",
        );
    };
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(c) => c,
        Err(e) => return ComponentReport::new(ComponentStatus::Error, "paddle", e.to_string()),
    };
    // Any HTTP answer means the server is up; only transport failures count.
    match client.get(url).send().await {
        Ok(resp) => ComponentReport::new(
            ComponentStatus::Ok,
            "paddle",
            format!("{url} answered HTTP {}", resp.status().as_u16()),
        ),
        Err(e) => ComponentReport::new(
            ComponentStatus::Error,
            "paddle",
            format!("{url} is not reachable: {e}"),
        ),
    }
}

/// pdfium is only needed for scanned documents, so its absence is a warning.
async fn check_pdfium(config: &AnalyzerConfig) -> ComponentReport {
    if config.rasterizer.is_some() {
        return ComponentReport::new(ComponentStatus::Ok, "pdfium", "injected rasterizer");
    }
    let rasterizer = PdfiumRasterizer::new(config.pdfium_lib_path.clone());
    let probed = tokio::task::spawn_blocking(move || rasterizer.probe()).await;
    match probed {
        Ok(Ok(())) => ComponentReport::new(ComponentStatus::Ok, "pdfium", "library loaded"),
        Ok(Err(e)) => ComponentReport::new(
            ComponentStatus::Warning,
            "pdfium",
            format!("scanned documents cannot be OCRed: {e}"),
        ),
        Err(e) => ComponentReport::new(ComponentStatus::Warning, "pdfium", format!("probe panicked: {e}")),
    }
}

fn check_llm(config: &AnalyzerConfig) -> ComponentReport {
    let name = format!("{}/{}", config.llm_backend, config.provider_name());
    if config.models.is_some() {
        return ComponentReport::new(ComponentStatus::Ok, name, "injected model clients");
    }
    match ModelClients::from_config(config) {
        Ok(_) => ComponentReport::new(
            ComponentStatus::Ok,
            name,
            format!(
                "analyzer={}, summary={}",
                config.model_for(crate::config::ModelRole::Analyzer),
                config.model_for(crate::config::ModelRole::Summary)
            ),
        ),
        Err(e) => ComponentReport::new(ComponentStatus::Error, name, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(name: &str) -> ComponentReport {
        ComponentReport::new(ComponentStatus::Ok, name, "fine")
    }

    #[test]
    fn overall_status_is_the_worst_component() {
        let s = SystemStatus::from_components(ok("tesseract"), ok("pdfium"), ok("hosted/openai"));
        assert!(s.is_ok());
        assert!(s.warnings.is_empty());

        let warn = ComponentReport::new(ComponentStatus::Warning, "pdfium", "missing");
        let s = SystemStatus::from_components(ok("tesseract"), warn, ok("hosted/openai"));
        assert_eq!(s.status, ComponentStatus::Warning);
        assert_eq!(s.warnings, vec!["pdfium (warning): missing"]);

        let err = ComponentReport::new(ComponentStatus::Error, "tesseract", "not found");
        let warn = ComponentReport::new(ComponentStatus::Warning, "pdfium", "missing");
        let s = SystemStatus::from_components(err, warn, ok("hosted/openai"));
        assert_eq!(s.status, ComponentStatus::Error);
        assert_eq!(s.warnings.len(), 2);
    }

    #[tokio::test]
    async fn missing_tesseract_is_an_error() {
        let config = AnalyzerConfig::builder()
            .tesseract_cmd("/nonexistent/tesseract-xyz")
            .build()
            .unwrap();
        let report = check_ocr(&config).await;
        assert_eq!(report.status, ComponentStatus::Error);
        assert!(report.detail.contains("/nonexistent/tesseract-xyz"));
    }

    #[tokio::test]
    async fn paddle_without_url_is_an_error() {
        let report = check_paddle(None).await;
        assert_eq!(report.status, ComponentStatus::Error);
        assert!(report.detail.contains("PADDLE_OCR_URL"));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ComponentStatus::Warning).unwrap(), "\"warning\"");
    }
}
