//! The record threaded through one pipeline run.
//!
//! Each text field is written exactly once, by the stage that produces it,
//! and can only be read after that write. Accessors return an error instead
//! of an empty string when a stage asks for something that does not exist
//! yet, so an ordering bug surfaces as a failed run rather than a prompt
//! built from nothing.

use crate::error::AnalyzerError;
use crate::output::PipelineResult;
use std::path::{Path, PathBuf};

/// Mutable state of one run. Created at run start, consumed into a
/// [`PipelineResult`] at the end; never shared between runs.
#[derive(Debug, Clone)]
pub struct AnalysisState {
    document: PathBuf,
    extracted_text: Option<String>,
    analysis_text: Option<String>,
    summary_text: Option<String>,
    validation_text: Option<String>,
}

impl AnalysisState {
    pub fn new(document: impl Into<PathBuf>) -> Self {
        Self {
            document: document.into(),
            extracted_text: None,
            analysis_text: None,
            summary_text: None,
            validation_text: None,
        }
    }

    pub fn document(&self) -> &Path {
        &self.document
    }

    pub fn extracted_text(&self) -> Result<&str, AnalyzerError> {
        read(&self.extracted_text, "extracted_text")
    }

    pub fn analysis_text(&self) -> Result<&str, AnalyzerError> {
        read(&self.analysis_text, "analysis_text")
    }

    pub fn summary_text(&self) -> Result<&str, AnalyzerError> {
        read(&self.summary_text, "summary_text")
    }

    pub fn validation_text(&self) -> Result<&str, AnalyzerError> {
        read(&self.validation_text, "validation_text")
    }

    pub fn set_extracted_text(&mut self, text: String) -> Result<(), AnalyzerError> {
        write_once(&mut self.extracted_text, text, "extracted_text")
    }

    pub fn set_analysis_text(&mut self, text: String) -> Result<(), AnalyzerError> {
        write_once(&mut self.analysis_text, text, "analysis_text")
    }

    pub fn set_summary_text(&mut self, text: String) -> Result<(), AnalyzerError> {
        write_once(&mut self.summary_text, text, "summary_text")
    }

    pub fn set_validation_text(&mut self, text: String) -> Result<(), AnalyzerError> {
        write_once(&mut self.validation_text, text, "validation_text")
    }

    /// True once the validation stage has committed its output.
    pub fn is_complete(&self) -> bool {
        self.validation_text.is_some()
    }

    /// Shape the finished state into a result. Fails if any stage output is missing.
    pub fn into_result(self, graph: Option<String>) -> Result<PipelineResult, AnalyzerError> {
        let take = |field: Option<String>, name: &str| {
            field.ok_or_else(|| AnalyzerError::Internal(format!("{name} missing at end of run")))
        };
        Ok(PipelineResult {
            analysis: take(self.analysis_text, "analysis_text")?,
            summary: take(self.summary_text, "summary_text")?,
            validation: take(self.validation_text, "validation_text")?,
            graph,
        })
    }
}

fn read<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str, AnalyzerError> {
    field
        .as_deref()
        .ok_or_else(|| AnalyzerError::Internal(format!("{name} read before it was produced")))
}

fn write_once(slot: &mut Option<String>, value: String, name: &str) -> Result<(), AnalyzerError> {
    if slot.is_some() {
        return Err(AnalyzerError::Internal(format!("{name} written twice")));
    }
    *slot = Some(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_start_empty() {
        let s = AnalysisState::new("doc.pdf");
        assert_eq!(s.document(), Path::new("doc.pdf"));
        assert!(s.extracted_text().is_err());
        assert!(!s.is_complete());
    }

    #[test]
    fn second_write_is_rejected() {
        let mut s = AnalysisState::new("doc.pdf");
        s.set_analysis_text("first".into()).unwrap();
        let err = s.set_analysis_text("second".into()).unwrap_err();
        assert!(err.to_string().contains("written twice"));
        assert_eq!(s.analysis_text().unwrap(), "first");
    }

    #[test]
    fn into_result_requires_every_stage_output() {
        let mut s = AnalysisState::new("doc.pdf");
        s.set_extracted_text("text".into()).unwrap();
        s.set_analysis_text("a".into()).unwrap();
        s.set_summary_text("s".into()).unwrap();
        assert!(s.clone().into_result(None).is_err());

        s.set_validation_text("v".into()).unwrap();
        let result = s.into_result(None).unwrap();
        assert_eq!(result.analysis, "a");
        assert_eq!(result.summary, "s");
        assert_eq!(result.validation, "v");
    }
}
