//! The caller-facing result of one pipeline run.

use serde::{Deserialize, Serialize};

/// Immutable output of a successful run, copied out of the final
/// [`crate::state::AnalysisState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Structured Markdown analysis (analysis stage).
    pub analysis: String,
    /// Condensed Markdown summary (summary stage).
    pub summary: String,
    /// Alignment assessment of diagnosis, treatment and medication (validation stage).
    pub validation: String,
    /// Mermaid rendering of the stage chain, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,
}

impl PipelineResult {
    /// Render the three sections as one Markdown document.
    pub fn to_markdown(&self) -> String {
        format!(
            "## Analysis\n\n{}\n\n## Summary\n\n{}\n\n## Validation\n\n{}\n",
            self.analysis.trim(),
            self.summary.trim(),
            self.validation.trim()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PipelineResult {
        PipelineResult {
            analysis: "a".into(),
            summary: "s".into(),
            validation: "v".into(),
            graph: None,
        }
    }

    #[test]
    fn markdown_has_three_sections_in_order() {
        let md = sample().to_markdown();
        let a = md.find("## Analysis").unwrap();
        let s = md.find("## Summary").unwrap();
        let v = md.find("## Validation").unwrap();
        assert!(a < s && s < v);
        assert!(md.ends_with('\n'));
    }

    #[test]
    fn graph_omitted_from_json_when_absent() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("graph"));
        let with_graph = PipelineResult {
            graph: Some("flowchart LR".into()),
            ..sample()
        };
        assert!(serde_json::to_string(&with_graph).unwrap().contains("flowchart"));
    }
}
