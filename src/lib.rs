//! # medical-analyzer
//!
//! Turn a medical PDF (discharge summary, lab report, referral letter) into
//! three Markdown documents: a structured analysis, a condensed summary, and
//! an assessment of whether diagnosis, treatment and medication fit the
//! patient's complaint.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 0. Input      existence, extension and %PDF checks
//!  ├─ 1. Extract    lopdf text layer; tesseract / PaddleOCR when it is too thin
//!  ├─ 2. Analyze    analyzer model → facility, providers, patient, medications
//!  ├─ 3. Summarize  summary model  → findings, diagnosis, treatment plan
//!  └─ 4. Validate   analyzer model → alignment, recommendations, risks
//! ```
//!
//! Stages run strictly in order and each writes exactly one field of the
//! run's [`AnalysisState`]. Any failure aborts the run; there are no partial
//! results.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medical_analyzer::{process, AnalyzerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OCR_ENGINE, LLM_BACKEND, ANALYZER_MODEL, ... are read from the environment
//!     let config = AnalyzerConfig::from_env()?;
//!     let result = process("discharge_summary.pdf", &config).await?;
//!     println!("{}", result.analysis);
//!     println!("{}", result.validation);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `medical-analyzer` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! ## Model Roles
//!
//! | Role | Stages | Hosted default | Local default |
//! |------|--------|----------------|---------------|
//! | analyzer | analyze, validate | `gpt-4.1-mini` | `llama3` |
//! | summary  | summarize         | `gpt-4.1-nano` | `phi3`   |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ocr;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod runner;
pub mod state;
pub mod uploads;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    AnalyzerConfig, AnalyzerConfigBuilder, LlmBackend, ModelRole, ModelRoleConfig, OcrEngineKind,
};
pub use diagnostics::{check_dependencies, ComponentReport, ComponentStatus, SystemStatus};
pub use error::AnalyzerError;
pub use ocr::OcrEngine;
pub use output::PipelineResult;
pub use pipeline::extract::TextExtractor;
pub use pipeline::llm::{ModelClient, ModelClients, PromptMessage, PromptStage};
pub use pipeline::render::PageRasterizer;
pub use pipeline::{AnalysisPipeline, Stage};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use runner::{process, process_bytes, process_sync, process_to_file, PipelineRunner};
pub use state::AnalysisState;
pub use uploads::{DocumentStore, StoredDocument};
