//! Entry points: analyse one document from a path or from bytes.
//!
//! [`PipelineRunner`] owns a ready-to-use [`AnalysisPipeline`] and is the
//! type to keep around when many documents are processed with the same
//! configuration. The free functions build a runner per call.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::output::PipelineResult;
use crate::pipeline::{input, AnalysisPipeline};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

/// Validates input, runs the pipeline once, and shapes the result.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    pipeline: AnalysisPipeline,
    include_graph: bool,
}

impl PipelineRunner {
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        Self {
            pipeline,
            include_graph: false,
        }
    }

    /// Build the pipeline described by `config`.
    ///
    /// Model clients and the OCR engine are constructed here, so a missing
    /// API key or a malformed OCR URL surfaces before any document is read.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let pipeline = AnalysisPipeline::from_config(config)?;
        Ok(Self::new(pipeline).with_graph(config.include_graph))
    }

    /// Attach the Mermaid stage diagram to every result.
    pub fn with_graph(mut self, include: bool) -> Self {
        self.include_graph = include;
        self
    }

    pub fn pipeline(&self) -> &AnalysisPipeline {
        &self.pipeline
    }

    /// Analyse the PDF at `path`.
    ///
    /// # Errors
    /// - [`AnalyzerError::DocumentNotFound`] if nothing exists at `path`;
    ///   checked before the extension, so a missing `x.txt` is not found
    /// - [`AnalyzerError::UnsupportedFormat`] for a non-PDF file
    /// - any stage failure, wrapped in [`AnalyzerError::StageFailed`]
    ///
    /// No partial result is ever returned.
    pub async fn process(&self, path: impl AsRef<Path>) -> Result<PipelineResult, AnalyzerError> {
        let path = path.as_ref();
        let start = Instant::now();
        info!("Processing document: {}", path.display());

        input::validate_document(path)?;

        if let Some(cb) = self.pipeline.progress() {
            cb.on_pipeline_start(path);
        }

        let state = self.pipeline.run(path).await.inspect_err(|e| {
            error!("Analysis of {} failed: {}", path.display(), e);
        })?;

        let graph = self.include_graph.then(|| self.pipeline.graph());
        let result = state.into_result(graph)?;

        if let Some(cb) = self.pipeline.progress() {
            cb.on_pipeline_complete(path);
        }
        info!(
            "Finished {} in {:.1}s",
            path.display(),
            start.elapsed().as_secs_f64()
        );
        Ok(result)
    }

    /// Analyse an in-memory PDF.
    ///
    /// The bytes are written to a managed temp file with a `.pdf` suffix,
    /// deleted when this call returns.
    pub async fn process_bytes(&self, bytes: &[u8]) -> Result<PipelineResult, AnalyzerError> {
        let mut tmp = tempfile::Builder::new()
            .prefix("medical-analyzer-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| AnalyzerError::Internal(format!("tempfile: {e}")))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.flush())
            .map_err(|e| AnalyzerError::Internal(format!("tempfile write: {e}")))?;
        self.process(tmp.path()).await
    }
}

/// Analyse the PDF at `path` with a runner built from `config`.
///
/// # Example
/// ```rust,no_run
/// use medical_analyzer::{process, AnalyzerConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AnalyzerConfig::from_env()?;
/// let result = process("discharge_summary.pdf", &config).await?;
/// println!("{}", result.to_markdown());
/// # Ok(())
/// # }
/// ```
pub async fn process(
    path: impl AsRef<Path>,
    config: &AnalyzerConfig,
) -> Result<PipelineResult, AnalyzerError> {
    PipelineRunner::from_config(config)?.process(path).await
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally; do not call from inside
/// an async context.
pub fn process_sync(
    path: impl AsRef<Path>,
    config: &AnalyzerConfig,
) -> Result<PipelineResult, AnalyzerError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AnalyzerError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process(path, config))
}

/// Analyse PDF bytes held in memory.
pub async fn process_bytes(
    bytes: &[u8],
    config: &AnalyzerConfig,
) -> Result<PipelineResult, AnalyzerError> {
    PipelineRunner::from_config(config)?.process_bytes(bytes).await
}

/// Analyse a PDF and write the Markdown report to `output`.
///
/// Written to a sibling temp file first and renamed into place, so a failed
/// run never leaves a truncated report behind.
pub async fn process_to_file(
    path: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &AnalyzerConfig,
) -> Result<PipelineResult, AnalyzerError> {
    let result = process(path, config).await?;
    write_report(output.as_ref(), &result.to_markdown()).await?;
    Ok(result)
}

/// Atomically write `contents` to `path`, creating parent directories.
pub async fn write_report(path: &Path, contents: &str) -> Result<(), AnalyzerError> {
    let io_err = |source: std::io::Error| AnalyzerError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents).await.map_err(io_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_report_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("nested/report.md");
        write_report(&out, "## Analysis\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "## Analysis\n");
        assert!(!out.with_extension("md.tmp").exists());
    }
}
