//! Pipeline stages for medical document analysis.
//!
//! Each submodule implements one concern; [`AnalysisPipeline`] wires them
//! into a fixed chain and threads an [`AnalysisState`] through it.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ analyze ──▶ summarize ──▶ validate
//! (checks)  (lopdf/OCR)  (analyzer)  (summary)     (analyzer)
//! ```
//!
//! 1. [`input`]: reject missing or non-PDF files before any work starts
//! 2. [`extract`]: direct text layer first, page OCR when it is too thin;
//!    rasterisation goes through [`render`] and [`encode`]
//! 3. [`llm`]: one model call per prompt stage; the only stage with
//!    network I/O besides the Paddle OCR client
//! 4. [`postprocess`]: strip a leading reasoning trace from model output

pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;

use crate::config::{AnalyzerConfig, ModelRole};
use crate::error::AnalyzerError;
use crate::ocr;
use crate::progress::ProgressCallback;
use crate::prompts;
use crate::state::AnalysisState;
use extract::TextExtractor;
use llm::{ModelClients, PromptStage};
use render::{PageRasterizer, PdfiumRasterizer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

// ── Stage ────────────────────────────────────────────────────────────────

/// One transition of the analysis chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Analyze,
    Summarize,
    Validate,
}

impl Stage {
    /// Execution order. Every run visits each stage exactly once, in this order.
    pub const ALL: [Stage; 4] = [
        Stage::Extract,
        Stage::Analyze,
        Stage::Summarize,
        Stage::Validate,
    ];

    /// Model role a prompt stage is bound to. `None` for extraction.
    pub fn role(&self) -> Option<ModelRole> {
        match self {
            Stage::Extract => None,
            Stage::Analyze | Stage::Validate => Some(ModelRole::Analyzer),
            Stage::Summarize => Some(ModelRole::Summary),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Analyze => "analyze",
            Stage::Summarize => "summarize",
            Stage::Validate => "validate",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Stage::Extract => "Extract text",
            Stage::Analyze => "Analyze",
            Stage::Summarize => "Summarize",
            Stage::Validate => "Validate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── AnalysisPipeline ─────────────────────────────────────────────────────

/// The fixed Extract → Analyze → Summarize → Validate chain.
///
/// Holds only collaborators, never per-run data, so one pipeline can serve
/// any number of sequential or concurrent runs.
#[derive(Clone)]
pub struct AnalysisPipeline {
    extractor: TextExtractor,
    models: ModelClients,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisPipeline")
            .field("extractor", &self.extractor)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish_non_exhaustive()
    }
}

impl AnalysisPipeline {
    pub fn new(extractor: TextExtractor, models: ModelClients) -> Self {
        Self {
            extractor,
            models,
            progress: None,
        }
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    pub fn progress(&self) -> Option<&ProgressCallback> {
        self.progress.as_ref()
    }

    /// Assemble a pipeline from configuration.
    ///
    /// Injected collaborators in `config` win; anything missing is built
    /// from the configured OCR engine, pdfium location and model backend.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let ocr = match &config.ocr {
            Some(engine) => Arc::clone(engine),
            None => ocr::select_engine(config)?,
        };
        let rasterizer: Arc<dyn PageRasterizer> = match &config.rasterizer {
            Some(r) => Arc::clone(r),
            None => Arc::new(PdfiumRasterizer::new(config.pdfium_lib_path.clone())),
        };
        let models = match &config.models {
            Some(m) => m.clone(),
            None => ModelClients::from_config(config)?,
        };

        let extractor = TextExtractor::new(rasterizer, ocr)
            .with_min_chars(config.min_text_chars)
            .with_max_rendered_pixels(config.max_rendered_pixels);

        let mut pipeline = Self::new(extractor, models);
        if let Some(cb) = &config.progress_callback {
            pipeline = pipeline.with_progress(Arc::clone(cb));
        }
        Ok(pipeline)
    }

    /// Execute every stage against `document`.
    ///
    /// The path is assumed to be validated already; see
    /// [`crate::runner::PipelineRunner::process`]. The first failing stage
    /// aborts the run and its error is returned wrapped in
    /// [`AnalyzerError::StageFailed`].
    pub async fn run(&self, document: &Path) -> Result<AnalysisState, AnalyzerError> {
        let mut state = AnalysisState::new(document);

        for stage in Stage::ALL {
            info!("Stage {} started", stage);
            if let Some(cb) = &self.progress {
                cb.on_stage_start(stage);
            }
            let start = Instant::now();

            match self.run_stage(stage, &mut state).await {
                Ok(output_len) => {
                    info!(
                        "Stage {} produced {} chars in {:?}",
                        stage,
                        output_len,
                        start.elapsed()
                    );
                    if let Some(cb) = &self.progress {
                        cb.on_stage_complete(stage, output_len);
                    }
                }
                Err(e) => {
                    if let Some(cb) = &self.progress {
                        cb.on_stage_error(stage, &e.to_string());
                    }
                    return Err(e.in_stage(stage));
                }
            }
        }

        info!("Analysis chain finished for {}", document.display());
        Ok(state)
    }

    /// Run one stage and commit its output. Returns the output length in chars.
    async fn run_stage(
        &self,
        stage: Stage,
        state: &mut AnalysisState,
    ) -> Result<usize, AnalyzerError> {
        let output = match stage {
            Stage::Extract => self.extractor.extract(state.document()).await?,
            Stage::Analyze => {
                let payload = prompts::analysis_request(state.extracted_text()?);
                self.prompt_stage(stage)?.run(&payload).await?
            }
            Stage::Summarize => {
                let payload = prompts::summary_request(state.analysis_text()?);
                self.prompt_stage(stage)?.run(&payload).await?
            }
            Stage::Validate => {
                let payload =
                    prompts::validation_request(state.analysis_text()?, state.summary_text()?);
                self.prompt_stage(stage)?.run(&payload).await?
            }
        };

        let len = output.chars().count();
        match stage {
            Stage::Extract => state.set_extracted_text(output)?,
            Stage::Analyze => state.set_analysis_text(output)?,
            Stage::Summarize => state.set_summary_text(output)?,
            Stage::Validate => state.set_validation_text(output)?,
        }
        Ok(len)
    }

    fn prompt_stage(&self, stage: Stage) -> Result<PromptStage, AnalyzerError> {
        let role = stage
            .role()
            .ok_or_else(|| AnalyzerError::Internal(format!("stage '{stage}' has no model role")))?;
        Ok(PromptStage::new(stage, Arc::clone(self.models.client(role))))
    }

    /// Mermaid flowchart of the stage chain.
    pub fn graph(&self) -> String {
        render_graph()
    }
}

/// Mermaid text for the fixed chain. Independent of any pipeline instance.
pub fn render_graph() -> String {
    let mut out = String::from("flowchart LR\n  start([Start])");
    for stage in Stage::ALL {
        out.push_str(&format!(" --> {}[{}]", stage.as_str(), stage.label()));
        out.push_str(&format!("\n  {}", stage.as_str()));
    }
    out.push_str(" --> finish([End])\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_fixed() {
        assert_eq!(
            Stage::ALL,
            [
                Stage::Extract,
                Stage::Analyze,
                Stage::Summarize,
                Stage::Validate
            ]
        );
    }

    #[test]
    fn prompt_stages_bind_to_roles() {
        assert_eq!(Stage::Extract.role(), None);
        assert_eq!(Stage::Analyze.role(), Some(ModelRole::Analyzer));
        assert_eq!(Stage::Summarize.role(), Some(ModelRole::Summary));
        assert_eq!(Stage::Validate.role(), Some(ModelRole::Analyzer));
    }

    #[test]
    fn stage_display_is_lowercase() {
        assert_eq!(Stage::Summarize.to_string(), "summarize");
        assert_eq!(serde_json::to_string(&Stage::Validate).unwrap(), "\"validate\"");
    }

    #[test]
    fn graph_lists_stages_in_order() {
        let g = render_graph();
        assert!(g.starts_with("flowchart LR"));
        let pos: Vec<usize> = Stage::ALL
            .iter()
            .map(|s| g.find(&format!("{}[", s.as_str())).unwrap())
            .collect();
        assert!(pos.windows(2).all(|w| w[0] < w[1]));
        assert!(g.contains("start([Start]) --> extract[Extract text]"));
        assert!(g.contains("validate --> finish([End])"));
    }
}
