//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::AnalyzerConfigBuilder::progress_callback`] to be told when
//! each stage starts and finishes. Events are observational only; nothing the
//! callback does can change the data flowing through the pipeline.
//!
//! # Example
//!
//! ```rust
//! use medical_analyzer::{AnalyzerConfig, PipelineProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl PipelineProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, output_len: usize) {
//!         eprintln!("{stage} done ({output_len} chars)");
//!     }
//! }
//!
//! let config = AnalyzerConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::Stage;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it moves through its stages.
///
/// Stages run strictly one after another, but separate runs may share one
/// callback from different tasks, hence `Send + Sync`. All methods have
/// default no-op implementations.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once, after input validation, before the first stage.
    fn on_pipeline_start(&self, document: &Path) {
        let _ = document;
    }

    /// Called just before a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage has committed its output.
    ///
    /// # Arguments
    /// * `stage`: the stage that finished
    /// * `output_len`: character count of the text it produced
    fn on_stage_complete(&self, stage: Stage, output_len: usize) {
        let _ = (stage, output_len);
    }

    /// Called when a stage fails. The run stops after this.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once after the last stage succeeded.
    fn on_pipeline_complete(&self, document: &Path) {
        let _ = document;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalyzerConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl PipelineProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start:{stage}"));
        }

        fn on_stage_complete(&self, stage: Stage, output_len: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done:{stage}:{output_len}"));
        }

        fn on_stage_error(&self, stage: Stage, error: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("error:{stage}:{error}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_pipeline_start(Path::new("a.pdf"));
        cb.on_stage_start(Stage::Extract);
        cb.on_stage_complete(Stage::Extract, 10);
        cb.on_stage_error(Stage::Analyze, "boom");
        cb.on_pipeline_complete(Path::new("a.pdf"));
    }

    #[test]
    fn recorder_sees_events_in_order() {
        let rec = Recorder::default();
        rec.on_stage_start(Stage::Analyze);
        rec.on_stage_complete(Stage::Analyze, 42);
        rec.on_stage_error(Stage::Summarize, "timeout");
        let events = rec.events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["start:analyze", "done:analyze:42", "error:summarize:timeout"]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Validate);
    }
}
