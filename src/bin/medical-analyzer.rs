//! CLI binary for medical-analyzer.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalyzerConfig`, runs one document, and prints the three sections.

use anyhow::{Context, Result};
use clap::Parser;
use medical_analyzer::runner::write_report;
use medical_analyzer::{
    check_dependencies, AnalyzerConfig, ComponentStatus, DocumentStore, LlmBackend,
    OcrEngineKind, PipelineProgressCallback, PipelineRunner, ProgressCallback, Stage,
    SystemStatus,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that names the running stage and logs one line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(Stage::ALL.len() as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:20.green/238}] {pos}/{len}  {msg}  ⏱ {elapsed}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Analyzing");
        bar.set_message("validating input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_started: Mutex::new(None),
        })
    }

    fn elapsed(&self) -> f64 {
        self.stage_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

fn stage_message(stage: Stage) -> &'static str {
    match stage {
        Stage::Extract => "extracting text…",
        Stage::Analyze => "analyzing document…",
        Stage::Summarize => "writing summary…",
        Stage::Validate => "validating diagnosis…",
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        if let Ok(mut t) = self.stage_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(stage_message(stage));
    }

    fn on_stage_complete(&self, stage: Stage, output_len: usize) {
        let secs = self.elapsed();
        self.bar.println(format!(
            "  {} {:<10} {:<12} {}",
            green("✓"),
            stage,
            dim(&format!("{output_len:>6} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        let secs = self.elapsed();
        let msg = match error.char_indices().nth(80) {
            Some((idx, _)) => format!("{}\u{2026}", &error[..idx]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} {:<10} {}  {}",
            red("✗"),
            stage,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.finish_and_clear();
    }

    fn on_pipeline_complete(&self, _document: &Path) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a report (hosted models, tesseract fallback)
  medical-analyzer discharge_summary.pdf

  # Local models via Ollama, PaddleOCR for scans
  medical-analyzer --llm-backend local --ocr-engine paddle \
      --paddle-url http://localhost:8080 scan.pdf

  # Save the report, include the stage diagram
  medical-analyzer --graph report.pdf -o report.md

  # Machine-readable output
  medical-analyzer --json report.pdf > report.json

  # Check OCR, pdfium and model setup
  medical-analyzer --check

  # Remove uploads older than one day
  medical-analyzer --cleanup ./uploads

ENVIRONMENT VARIABLES:
  OCR_ENGINE        tesseract (default) or paddle
  LLM_BACKEND       hosted (default) or local / ollama
  LLM_PROVIDER      hosted provider name (openai, anthropic, gemini, ...)
  ANALYZER_MODEL    model for analysis and validation
  SUMMARY_MODEL     model for the summary
  TESSERACT_CMD     tesseract executable
  PADDLE_OCR_URL    PaddleOCR serving endpoint
  PDFIUM_LIB_PATH   directory holding the pdfium library
  OPENAI_API_KEY    (and other provider keys) read by the model client
"#;

/// Analyse medical PDF documents with language models.
#[derive(Parser, Debug)]
#[command(
    name = "medical-analyzer",
    version,
    about = "Analyse medical PDF documents: structured analysis, summary, and diagnosis validation",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF document to analyse.
    #[arg(required_unless_present_any = ["check", "cleanup"])]
    input: Option<PathBuf>,

    /// Write the report to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// OCR engine for documents without a text layer: tesseract, paddle.
    #[arg(long, env = "OCR_ENGINE", default_value = "tesseract")]
    ocr_engine: OcrEngineKind,

    /// Where the models run: hosted, local.
    #[arg(long, env = "LLM_BACKEND", default_value = "hosted")]
    llm_backend: LlmBackend,

    /// Hosted provider name (openai, anthropic, gemini, ...).
    #[arg(long, env = "LLM_PROVIDER")]
    provider: Option<String>,

    /// Model for the analysis and validation stages.
    #[arg(long, env = "ANALYZER_MODEL")]
    analyzer_model: Option<String>,

    /// Model for the summary stage.
    #[arg(long, env = "SUMMARY_MODEL")]
    summary_model: Option<String>,

    /// Tesseract executable.
    #[arg(long, env = "TESSERACT_CMD")]
    tesseract_cmd: Option<String>,

    /// Tesseract language(s), `+`-joined.
    #[arg(long, env = "TESSERACT_LANG")]
    tesseract_lang: Option<String>,

    /// PaddleOCR serving endpoint, e.g. http://localhost:8080.
    #[arg(long, env = "PADDLE_OCR_URL")]
    paddle_url: Option<String>,

    /// Directory containing the pdfium library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Include a Mermaid diagram of the stage chain in the output.
    #[arg(long)]
    graph: bool,

    /// Output structured JSON instead of Markdown.
    #[arg(long)]
    json: bool,

    /// Check OCR, pdfium and model dependencies, then exit.
    #[arg(long)]
    check: bool,

    /// Delete expired uploads in DIR, then exit.
    #[arg(long, value_name = "DIR")]
    cleanup: Option<PathBuf>,

    /// Retention for --cleanup, in days.
    #[arg(long, default_value_t = medical_analyzer::uploads::DEFAULT_RETENTION_DAYS)]
    retention_days: i64,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; library INFO logs
    // would tear through it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.input.is_some();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Maintenance modes ────────────────────────────────────────────────
    if let Some(ref dir) = cli.cleanup {
        let store = DocumentStore::new(dir).with_retention(chrono::Duration::days(cli.retention_days));
        let removed = store
            .cleanup_expired(chrono::Utc::now())
            .with_context(|| format!("Cleanup of {} failed", dir.display()))?;
        if !cli.quiet {
            eprintln!("{} Cleanup completed. {} files removed.", green("✔"), removed);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    if cli.check {
        let status = check_dependencies(&config).await;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("Failed to serialise status")?
            );
        } else {
            print_status(&status);
        }
        return Ok(if status.status == ComponentStatus::Error {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    let Some(ref input) = cli.input else {
        anyhow::bail!("No input document given");
    };

    if !cli.quiet && !cli.json {
        print_banner(&config);
    }

    // ── Run analysis ─────────────────────────────────────────────────────
    let runner = PipelineRunner::from_config(&config).context("Failed to set up the pipeline")?;
    let result = runner
        .process(input)
        .await
        .with_context(|| format!("Analysis of {} failed", input.display()))?;

    let rendered = if cli.json {
        serde_json::to_string_pretty(&result).context("Failed to serialise result")?
    } else {
        let mut md = result.to_markdown();
        if let Some(ref graph) = result.graph {
            md.push_str(&format!("\n## Pipeline\n\n```mermaid\n{graph}```\n"));
        }
        md
    };

    if let Some(ref output_path) = cli.output {
        write_report(output_path, &rendered)
            .await
            .context("Failed to write report")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}  →  {}",
                green("✔"),
                input.display(),
                bold(&output_path.display().to_string())
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Map CLI args to `AnalyzerConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
        .ocr_engine(cli.ocr_engine)
        .llm_backend(cli.llm_backend)
        .include_graph(cli.graph);

    if let Some(ref p) = cli.provider {
        builder = builder.hosted_provider(p);
    }
    if let Some(ref m) = cli.analyzer_model {
        builder = builder.analyzer_model(m);
    }
    if let Some(ref m) = cli.summary_model {
        builder = builder.summary_model(m);
    }
    if let Some(ref c) = cli.tesseract_cmd {
        builder = builder.tesseract_cmd(c);
    }
    if let Some(ref l) = cli.tesseract_lang {
        builder = builder.tesseract_lang(l);
    }
    if let Some(ref u) = cli.paddle_url {
        builder = builder.paddle_url(u);
    }
    if let Some(ref p) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(p);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_banner(config: &AnalyzerConfig) {
    let rule = "=".repeat(60);
    eprintln!("{rule}");
    eprintln!("{}", bold(&format!("{:^60}", " Medical Document Analyzer ")));
    eprintln!("{rule}");
    eprintln!(" OCR Engine:  {}", config.ocr_engine);
    eprintln!(
        " LLM Backend: {} ({})",
        config.llm_backend,
        config.provider_name()
    );
    eprintln!("{rule}");
}

fn print_status(status: &SystemStatus) {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("{:=^60}", " System Dependency Check ");
    println!("{rule}");
    for (label, report) in [("OCR", &status.ocr), ("PDF renderer", &status.pdf), ("LLM", &status.llm)] {
        let mark = match report.status {
            ComponentStatus::Ok => green("✔"),
            ComponentStatus::Warning => yellow("⚠"),
            ComponentStatus::Error => red("✘"),
        };
        println!("  {mark} {label:<13} {:<16} {}", report.name, dim(&report.detail));
    }
    println!("{rule}");
    println!("  Overall: {}", bold(&status.status.to_string()));
}
