//! Error types for the medical-analyzer library.
//!
//! Every failure is fatal for the current run: the pipeline never recovers
//! silently and never returns a partial result. Errors raised inside a stage
//! transition are wrapped in [`AnalyzerError::StageFailed`] so callers can
//! tell which stage broke; [`AnalyzerError::cause`] peels that wrapper off
//! when only the underlying kind matters.

use crate::config::ModelRole;
use crate::pipeline::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the medical-analyzer library.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Document was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    DocumentNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file is not something the pipeline can read.
    #[error("Unsupported document '{path}': {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },

    /// Upload exceeds the configured size limit.
    #[error("File '{name}' is {size} bytes, maximum allowed is {max} bytes")]
    FileTooLarge { name: String, size: u64, max: u64 },

    // ── Environment errors ────────────────────────────────────────────────
    /// An OCR engine, PDF library or model client is not available.
    #[error("Required dependency '{dependency}' is not available.\n{hint}")]
    DependencyMissing { dependency: String, hint: String },

    /// An engine or backend name was not recognised, or a value is out of range.
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    // ── Processing errors ─────────────────────────────────────────────────
    /// Text extraction (direct or OCR) failed.
    #[error("Text extraction failed: {detail}")]
    ExtractionFailure {
        detail: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The model backend returned an error.
    #[error("Model call for role '{role}' failed: {message}")]
    UpstreamModelError { role: ModelRole, message: String },

    /// A pipeline transition failed; `source` holds the underlying error.
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<AnalyzerError>,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Reading or writing a stored document failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (a broken pipeline invariant, a panicked task).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalyzerError {
    /// Build an [`AnalyzerError::ExtractionFailure`] with no underlying source.
    pub fn extraction(detail: impl Into<String>) -> Self {
        Self::ExtractionFailure {
            detail: detail.into(),
            source: None,
        }
    }

    /// Build an [`AnalyzerError::ExtractionFailure`] that keeps the original cause.
    pub fn extraction_with<E>(detail: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ExtractionFailure {
            detail: detail.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Attach the failing stage. Already-wrapped errors are returned as-is.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            e @ Self::StageFailed { .. } => e,
            other => Self::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, without the stage wrapper.
    pub fn cause(&self) -> &AnalyzerError {
        match self {
            Self::StageFailed { source, .. } => source.cause(),
            other => other,
        }
    }

    /// The stage that failed, if the error was raised inside the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_failed_display_names_stage_and_cause() {
        let e = AnalyzerError::UpstreamModelError {
            role: ModelRole::Summary,
            message: "connection reset".into(),
        }
        .in_stage(Stage::Summarize);
        let msg = e.to_string();
        assert!(msg.contains("summarize"), "got: {msg}");
        assert!(msg.contains("connection reset"), "got: {msg}");
        assert_eq!(e.stage(), Some(Stage::Summarize));
    }

    #[test]
    fn cause_unwraps_stage_wrapper() {
        let e = AnalyzerError::extraction("bad page").in_stage(Stage::Extract);
        assert!(matches!(e.cause(), AnalyzerError::ExtractionFailure { .. }));
    }

    #[test]
    fn in_stage_does_not_double_wrap() {
        let e = AnalyzerError::Internal("x".into())
            .in_stage(Stage::Analyze)
            .in_stage(Stage::Validate);
        assert_eq!(e.stage(), Some(Stage::Analyze));
    }

    #[test]
    fn extraction_with_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let e = AnalyzerError::extraction_with("render failed", io);
        let source = std::error::Error::source(&e).expect("source kept");
        assert!(source.to_string().contains("disk on fire"));
    }

    #[test]
    fn dependency_missing_display() {
        let e = AnalyzerError::DependencyMissing {
            dependency: "tesseract".into(),
            hint: "install it".into(),
        };
        assert!(e.to_string().contains("tesseract"));
    }
}
