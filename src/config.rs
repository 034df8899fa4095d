//! Configuration types for medical document analysis.
//!
//! Every knob lives in [`AnalyzerConfig`], built via [`AnalyzerConfigBuilder`]
//! or read from the process environment with [`AnalyzerConfig::from_env`].
//! Values are resolved once, when the pipeline is constructed; nothing in
//! the pipeline reads configuration afterwards.
//!
//! Collaborators can be injected directly (model clients, OCR engine, page
//! rasteriser, progress callback). When they are, the corresponding
//! name-based settings are ignored.

use crate::error::AnalyzerError;
use crate::ocr::OcrEngine;
use crate::pipeline::extract::MIN_MEANINGFUL_CHARS;
use crate::pipeline::llm::ModelClients;
use crate::pipeline::render::PageRasterizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for one analysis pipeline.
///
/// # Example
/// ```rust
/// use medical_analyzer::{AnalyzerConfig, LlmBackend, OcrEngineKind};
///
/// let config = AnalyzerConfig::builder()
///     .ocr_engine(OcrEngineKind::Tesseract)
///     .llm_backend(LlmBackend::Local)
///     .analyzer_model("llama3")
///     .build()
///     .unwrap();
/// assert_eq!(config.model_for(medical_analyzer::ModelRole::Summary), "phi3");
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// OCR engine used when the PDF has no usable text layer. Default: Tesseract.
    pub ocr_engine: OcrEngineKind,

    /// Where the models run. Default: [`LlmBackend::Hosted`].
    pub llm_backend: LlmBackend,

    /// Provider name passed to `ProviderFactory` for the hosted backend. Default: "openai".
    pub hosted_provider: String,

    /// Model for the analyzer role. If None, uses the backend default.
    pub analyzer_model: Option<String>,

    /// Model for the summary role. If None, uses the backend default.
    pub summary_model: Option<String>,

    /// Sampling temperature for the analyzer role (analysis and validation). Default: 0.6.
    pub analyzer_temperature: f32,

    /// Sampling temperature for the summary role. Default: 0.0.
    pub summary_temperature: f32,

    /// Maximum tokens a single stage may generate. Default: 4096.
    pub max_tokens: usize,

    /// Tesseract executable. Default: "tesseract".
    pub tesseract_cmd: String,

    /// Tesseract language pack(s), `+`-joined. Default: "eng".
    pub tesseract_lang: String,

    /// Base URL of a PaddleOCR serving endpoint, e.g. `http://localhost:8080`.
    pub paddle_url: Option<String>,

    /// Explicit pdfium library location. If None, the system library is used.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Maximum rendered page dimension in pixels for OCR. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Direct extraction must produce more than this many characters
    /// to skip OCR. Default: 100.
    pub min_text_chars: usize,

    /// Attach the Mermaid stage diagram to each result. Default: false.
    pub include_graph: bool,

    /// Pre-built model clients. Take precedence over backend/model settings.
    pub models: Option<ModelClients>,

    /// Pre-built OCR engine. Takes precedence over `ocr_engine`.
    pub ocr: Option<Arc<dyn OcrEngine>>,

    /// Pre-built page rasteriser. Takes precedence over pdfium.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Receives stage start/completion events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ocr_engine: OcrEngineKind::default(),
            llm_backend: LlmBackend::default(),
            hosted_provider: "openai".to_string(),
            analyzer_model: None,
            summary_model: None,
            analyzer_temperature: 0.6,
            summary_temperature: 0.0,
            max_tokens: 4096,
            tesseract_cmd: "tesseract".to_string(),
            tesseract_lang: "eng".to_string(),
            paddle_url: None,
            pdfium_lib_path: None,
            max_rendered_pixels: 2000,
            min_text_chars: MIN_MEANINGFUL_CHARS,
            include_graph: false,
            models: None,
            ocr: None,
            rasterizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("ocr_engine", &self.ocr_engine)
            .field("llm_backend", &self.llm_backend)
            .field("hosted_provider", &self.hosted_provider)
            .field("analyzer_model", &self.analyzer_model)
            .field("summary_model", &self.summary_model)
            .field("analyzer_temperature", &self.analyzer_temperature)
            .field("summary_temperature", &self.summary_temperature)
            .field("max_tokens", &self.max_tokens)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("paddle_url", &self.paddle_url)
            .field("min_text_chars", &self.min_text_chars)
            .field("models", &self.models.as_ref().map(|_| "<ModelClients>"))
            .field("ocr", &self.ocr.as_ref().map(|o| o.name()))
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"))
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read configuration from the process environment.
    ///
    /// | Variable          | Field                 |
    /// |-------------------|-----------------------|
    /// | `OCR_ENGINE`      | `ocr_engine`          |
    /// | `LLM_BACKEND`     | `llm_backend`         |
    /// | `LLM_PROVIDER`    | `hosted_provider`     |
    /// | `ANALYZER_MODEL`  | `analyzer_model`      |
    /// | `SUMMARY_MODEL`   | `summary_model`       |
    /// | `TESSERACT_CMD`   | `tesseract_cmd`       |
    /// | `TESSERACT_LANG`  | `tesseract_lang`      |
    /// | `PADDLE_OCR_URL`  | `paddle_url`          |
    /// | `PDFIUM_LIB_PATH` | `pdfium_lib_path`     |
    pub fn from_env() -> Result<Self, AnalyzerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalyzerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(v) = get("OCR_ENGINE") {
            builder = builder.ocr_engine(v.parse()?);
        }
        if let Some(v) = get("LLM_BACKEND") {
            builder = builder.llm_backend(v.parse()?);
        }
        if let Some(v) = get("LLM_PROVIDER") {
            builder = builder.hosted_provider(v);
        }
        if let Some(v) = get("ANALYZER_MODEL") {
            builder = builder.analyzer_model(v);
        }
        if let Some(v) = get("SUMMARY_MODEL") {
            builder = builder.summary_model(v);
        }
        if let Some(v) = get("TESSERACT_CMD") {
            builder = builder.tesseract_cmd(v);
        }
        if let Some(v) = get("TESSERACT_LANG") {
            builder = builder.tesseract_lang(v);
        }
        if let Some(v) = get("PADDLE_OCR_URL") {
            builder = builder.paddle_url(v);
        }
        if let Some(v) = get("PDFIUM_LIB_PATH") {
            builder = builder.pdfium_lib_path(v);
        }

        builder.build()
    }

    /// Model identifier bound to `role`, falling back to the backend default.
    pub fn model_for(&self, role: ModelRole) -> &str {
        let explicit = match role {
            ModelRole::Analyzer => self.analyzer_model.as_deref(),
            ModelRole::Summary => self.summary_model.as_deref(),
        };
        explicit.unwrap_or_else(|| self.llm_backend.default_model(role))
    }

    /// Full model binding (model + temperature) for `role`.
    pub fn role_binding(&self, role: ModelRole) -> ModelRoleConfig {
        let temperature = match role {
            ModelRole::Analyzer => self.analyzer_temperature,
            ModelRole::Summary => self.summary_temperature,
        };
        ModelRoleConfig {
            model: self.model_for(role).to_string(),
            temperature,
        }
    }

    /// Provider name handed to `ProviderFactory` for the configured backend.
    pub fn provider_name(&self) -> &str {
        match self.llm_backend {
            LlmBackend::Hosted => &self.hosted_provider,
            LlmBackend::Local => "ollama",
        }
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn ocr_engine(mut self, kind: OcrEngineKind) -> Self {
        self.config.ocr_engine = kind;
        self
    }

    pub fn llm_backend(mut self, backend: LlmBackend) -> Self {
        self.config.llm_backend = backend;
        self
    }

    pub fn hosted_provider(mut self, name: impl Into<String>) -> Self {
        self.config.hosted_provider = name.into();
        self
    }

    pub fn analyzer_model(mut self, model: impl Into<String>) -> Self {
        self.config.analyzer_model = Some(model.into());
        self
    }

    pub fn summary_model(mut self, model: impl Into<String>) -> Self {
        self.config.summary_model = Some(model.into());
        self
    }

    pub fn analyzer_temperature(mut self, t: f32) -> Self {
        self.config.analyzer_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn summary_temperature(mut self, t: f32) -> Self {
        self.config.summary_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn tesseract_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.tesseract_lang = lang.into();
        self
    }

    pub fn paddle_url(mut self, url: impl Into<String>) -> Self {
        self.config.paddle_url = Some(url.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn include_graph(mut self, v: bool) -> Self {
        self.config.include_graph = v;
        self
    }

    pub fn models(mut self, models: ModelClients) -> Self {
        self.config.models = Some(models);
        self
    }

    pub fn ocr(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr = Some(engine);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, AnalyzerError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(AnalyzerError::ConfigurationError(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.llm_backend == LlmBackend::Hosted && c.hosted_provider.trim().is_empty() {
            return Err(AnalyzerError::ConfigurationError(
                "hosted backend requires a provider name".into(),
            ));
        }
        if c.tesseract_cmd.trim().is_empty() {
            return Err(AnalyzerError::ConfigurationError(
                "tesseract command must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The OCR engine used for the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// Tesseract via its command-line binary. (default)
    #[default]
    Tesseract,
    /// PaddleOCR via its HTTP serving endpoint.
    Paddle,
}

impl OcrEngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrEngineKind::Tesseract => "tesseract",
            OcrEngineKind::Paddle => "paddle",
        }
    }
}

impl fmt::Display for OcrEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrEngineKind {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tesseract" => Ok(OcrEngineKind::Tesseract),
            "paddle" | "paddleocr" => Ok(OcrEngineKind::Paddle),
            other => Err(AnalyzerError::ConfigurationError(format!(
                "Unsupported OCR engine '{other}' (expected: tesseract, paddle)"
            ))),
        }
    }
}

/// Where the language models run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// A hosted chat-completion API (OpenAI, Anthropic, Gemini, …). (default)
    #[default]
    Hosted,
    /// A locally hosted model runtime (Ollama).
    Local,
}

impl LlmBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmBackend::Hosted => "hosted",
            LlmBackend::Local => "local",
        }
    }

    /// Model used for `role` when none is configured.
    pub fn default_model(&self, role: ModelRole) -> &'static str {
        match (self, role) {
            (LlmBackend::Hosted, ModelRole::Analyzer) => "gpt-4.1-mini",
            (LlmBackend::Hosted, ModelRole::Summary) => "gpt-4.1-nano",
            (LlmBackend::Local, ModelRole::Analyzer) => "llama3",
            (LlmBackend::Local, ModelRole::Summary) => "phi3",
        }
    }
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmBackend {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hosted" => Ok(LlmBackend::Hosted),
            "local" | "ollama" => Ok(LlmBackend::Local),
            other => Err(AnalyzerError::ConfigurationError(format!(
                "Unsupported LLM backend '{other}' (expected: hosted, local)"
            ))),
        }
    }
}

/// A named model slot. Stages are bound to roles, roles to concrete models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    /// Higher-capability model for analysis and validation.
    Analyzer,
    /// Lighter model for condensation.
    Summary,
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelRole::Analyzer => "analyzer",
            ModelRole::Summary => "summary",
        })
    }
}

/// A resolved role binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRoleConfig {
    pub model: String,
    pub temperature: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let c = AnalyzerConfig::default();
        assert_eq!(c.ocr_engine, OcrEngineKind::Tesseract);
        assert_eq!(c.llm_backend, LlmBackend::Hosted);
        assert_eq!(c.min_text_chars, 100);
        assert_eq!(c.summary_temperature, 0.0);
        assert_eq!(c.provider_name(), "openai");
    }

    #[test]
    fn from_lookup_reads_engine_and_backend() {
        let c = AnalyzerConfig::from_lookup(lookup(&[
            ("OCR_ENGINE", "paddle"),
            ("LLM_BACKEND", "local"),
            ("PADDLE_OCR_URL", "http://localhost:8080"),
        ]))
        .unwrap();
        assert_eq!(c.ocr_engine, OcrEngineKind::Paddle);
        assert_eq!(c.llm_backend, LlmBackend::Local);
        assert_eq!(c.provider_name(), "ollama");
        assert_eq!(c.paddle_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn from_lookup_rejects_unknown_engine() {
        let err = AnalyzerConfig::from_lookup(lookup(&[("OCR_ENGINE", "abbyy")])).unwrap_err();
        assert!(matches!(err, AnalyzerError::ConfigurationError(_)));
        assert!(err.to_string().contains("abbyy"));
    }

    #[test]
    fn from_lookup_rejects_unknown_backend() {
        let err = AnalyzerConfig::from_lookup(lookup(&[("LLM_BACKEND", "quantum")])).unwrap_err();
        assert!(matches!(err, AnalyzerError::ConfigurationError(_)));
    }

    #[test]
    fn empty_values_are_ignored() {
        let c = AnalyzerConfig::from_lookup(lookup(&[("OCR_ENGINE", "  ")])).unwrap();
        assert_eq!(c.ocr_engine, OcrEngineKind::Tesseract);
    }

    #[test]
    fn role_binding_uses_overrides_and_temperatures() {
        let c = AnalyzerConfig::builder()
            .analyzer_model("my-analyzer")
            .summary_temperature(5.0)
            .build()
            .unwrap();
        let a = c.role_binding(ModelRole::Analyzer);
        assert_eq!(a.model, "my-analyzer");
        assert_eq!(a.temperature, 0.6);
        let s = c.role_binding(ModelRole::Summary);
        assert_eq!(s.model, "gpt-4.1-nano");
        assert_eq!(s.temperature, 2.0);
    }

    #[test]
    fn build_rejects_zero_max_tokens() {
        let err = AnalyzerConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(matches!(err, AnalyzerError::ConfigurationError(_)));
    }

    #[test]
    fn engine_names_round_trip_through_display() {
        for kind in [OcrEngineKind::Tesseract, OcrEngineKind::Paddle] {
            assert_eq!(kind.to_string().parse::<OcrEngineKind>().unwrap(), kind);
        }
        assert_eq!("Ollama".parse::<LlmBackend>().unwrap(), LlmBackend::Local);
    }
}
