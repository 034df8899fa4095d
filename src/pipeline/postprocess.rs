//! Deterministic cleanup of model output.
//!
//! Reasoning models prefix their answer with a thinking trace closed by
//! [`REASONING_TRACE_MARKER`]. Only the text after the marker is the answer.
//! Output without the marker is returned untouched, whitespace included.

/// Closing tag of a reasoning trace.
pub const REASONING_TRACE_MARKER: &str = "</think>";

/// Return the text after the last reasoning-trace marker, or `raw` unchanged.
pub fn strip_reasoning_trace(raw: &str) -> &str {
    match raw.rfind(REASONING_TRACE_MARKER) {
        Some(idx) => &raw[idx + REASONING_TRACE_MARKER.len()..],
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_marker_is_unchanged() {
        let raw = "  ### Key Findings\n- none\n";
        assert_eq!(strip_reasoning_trace(raw), raw);
    }

    #[test]
    fn trace_is_removed() {
        let raw = "<think>step 1, step 2</think>\n### Diagnosis\n- flu";
        assert_eq!(strip_reasoning_trace(raw), "\n### Diagnosis\n- flu");
    }

    #[test]
    fn last_marker_wins() {
        let raw = "a</think>b</think>answer";
        assert_eq!(strip_reasoning_trace(raw), "answer");
    }

    #[test]
    fn marker_at_end_leaves_empty_answer() {
        assert_eq!(strip_reasoning_trace("thinking</think>"), "");
    }
}
