//! PaddleOCR backend.
//!
//! PaddleOCR is a Python stack, so it is reached over HTTP: a PaddleX
//! serving instance (`paddlex --serve --pipeline OCR`) exposes `POST /ocr`,
//! which takes a base64 image and returns recognised lines per page.
//!
//! Lines of one page are joined with single spaces.

use crate::error::AnalyzerError;
use crate::ocr::OcrEngine;
use crate::pipeline::encode::encode_png_base64;
use async_trait::async_trait;
use image::DynamicImage;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// PaddleX `fileType` for a single image.
const FILE_TYPE_IMAGE: u8 = 1;

#[derive(Debug, Clone)]
pub struct PaddleEngine {
    endpoint: Option<Url>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(rename = "errorCode", default)]
    error_code: i64,
    #[serde(rename = "errorMsg", default)]
    error_msg: String,
    result: Option<OcrResult>,
}

#[derive(Debug, Deserialize)]
struct OcrResult {
    #[serde(rename = "ocrResults", default)]
    ocr_results: Vec<PageResult>,
}

#[derive(Debug, Deserialize)]
struct PageResult {
    #[serde(rename = "prunedResult")]
    pruned_result: PrunedResult,
}

#[derive(Debug, Deserialize)]
struct PrunedResult {
    #[serde(default)]
    rec_texts: Vec<String>,
}

impl PaddleEngine {
    /// `base_url` is the serving root, e.g. `http://localhost:8080`. A
    /// missing URL is accepted here and reported when a page is recognised.
    pub fn new(base_url: Option<String>) -> Result<Self, AnalyzerError> {
        let endpoint = base_url
            .map(|u| {
                let base = if u.ends_with('/') { u } else { format!("{u}/") };
                Url::parse(&base)
                    .and_then(|b| b.join("ocr"))
                    .map_err(|e| AnalyzerError::ConfigurationError(format!("invalid PaddleOCR URL '{base}': {e}")))
            })
            .transpose()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AnalyzerError::Internal(format!("could not build HTTP client: {e}")))?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    fn missing(&self, detail: impl std::fmt::Display) -> AnalyzerError {
        AnalyzerError::DependencyMissing {
            dependency: "paddle".to_string(),
            hint: format!(
                "PaddleOCR is not reachable: {detail}\n\
                 Start a PaddleX OCR server and set PADDLE_OCR_URL, or use --ocr-engine tesseract."
            ),
        }
    }
}

/// Join the recognised lines of every returned page.
fn collect_text(response: OcrResponse) -> Result<String, AnalyzerError> {
    if response.error_code != 0 {
        return Err(AnalyzerError::extraction(format!(
            "PaddleOCR error {}: {}",
            response.error_code, response.error_msg
        )));
    }
    let result = response
        .result
        .ok_or_else(|| AnalyzerError::extraction("PaddleOCR response has no result"))?;
    Ok(result
        .ocr_results
        .into_iter()
        .map(|p| p.pruned_result.rec_texts.join(" "))
        .collect::<Vec<_>>()
        .join(" "))
}

#[async_trait]
impl OcrEngine for PaddleEngine {
    fn name(&self) -> &'static str {
        "paddle"
    }

    async fn recognize(&self, page: &DynamicImage) -> Result<String, AnalyzerError> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| self.missing("no server URL configured"))?;

        let body = serde_json::json!({
            "file": encode_png_base64(page)?,
            "fileType": FILE_TYPE_IMAGE,
        });

        let response = self
            .client
            .post(endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    self.missing(e)
                } else {
                    AnalyzerError::extraction_with("PaddleOCR request failed", e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzerError::extraction(format!(
                "PaddleOCR returned HTTP {status}"
            )));
        }

        let parsed: OcrResponse = response
            .json()
            .await
            .map_err(|e| AnalyzerError::extraction_with("invalid PaddleOCR response", e))?;
        let text = collect_text(parsed)?;
        debug!("paddle recognised {} characters", text.chars().count());
        Ok(text)
    }
}
