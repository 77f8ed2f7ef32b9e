//! CLI binary for edgequake-pdf2docx.
//!
//! A thin shim over the library crate: it loads the config file, maps flags
//! to `RunOptions`, starts the run on the worker thread and renders the
//! progress channel with an indicatif bar until the run finishes.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2docx::channel::DEFAULT_POLL_INTERVAL;
use edgequake_pdf2docx::{
    spawn_run, AppConfig, DisplayState, ImageSize, Pipeline, ProgressMonitor, RunOptions, RunOutcome,
    RunSummary, TargetLanguage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Progress rendering ───────────────────────────────────────────────────────

/// Draws the last-seen [`DisplayState`] on each poll tick.
enum Renderer {
    /// Percentage bar with the status message beside it.
    Bar(ProgressBar),
    /// One plain line per new status message (`--no-progress`).
    Lines { last_message: String },
    /// Nothing at all (`--quiet`).
    Silent,
}

impl Renderer {
    fn new(quiet: bool, show_bar: bool) -> Self {
        if quiet {
            return Renderer::Silent;
        }
        if !show_bar {
            return Renderer::Lines {
                last_message: String::new(),
            };
        }

        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.set_message("准备中…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Renderer::Bar(bar)
    }

    fn render(&mut self, state: &DisplayState) {
        match self {
            Renderer::Bar(bar) => {
                bar.set_position(state.percent.round().clamp(0.0, 100.0) as u64);
                bar.set_message(state.message.clone());
            }
            Renderer::Lines { last_message } => {
                if !state.message.is_empty() && *last_message != state.message {
                    eprintln!("{} {}", dim(&format!("[{:>5.1}%]", state.percent)), state.message);
                    *last_message = state.message.clone();
                }
            }
            Renderer::Silent => {}
        }
    }

    fn finish(&self) {
        if let Renderer::Bar(bar) = self {
            bar.finish_and_clear();
        }
    }
}

// ── CLI ──────────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate a slide deck into Chinese (default)
  pdf2docx deck.pdf

  # English output, large images, sharpen pages first
  pdf2docx --lang en --size large --enhance deck.pdf

  # Keep the intermediate page images in temp_images/
  pdf2docx --enhance --keep-images deck.pdf

  # Use another config file and log file
  pdf2docx --config ~/pdf2docx.json --log-file /tmp/pdf2docx.log deck.pdf

OUTPUT:
  <deck.pdf>_转换结果.docx is written beside the PDF. Page images are
  staged in temp_images/ next to it and removed afterwards unless
  --keep-images is given.

CONFIG FILE (JSON):
  {
    "api_config":     { "endpoint": "https://…/v1/chat/completions", "key": "sk-…" },
    "ocr_settings":   { "dpi": 300, "language": "eng" },
    "poppler_config": { "path": "/opt/pdfium/lib" }
  }

ENVIRONMENT:
  RUST_LOG    Overrides the log filter (e.g. RUST_LOG=edgequake_pdf2docx=debug)
"#;

#[derive(Parser, Debug)]
#[command(
    name = "pdf2docx",
    version,
    about = "Convert a PDF into a bilingual Word document (page image + OCR text + translation)",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source PDF file.
    input: PathBuf,

    /// Configuration file (JSON).
    #[arg(long, env = "PDF2DOCX_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Target language: en, ch, es, fr.
    #[arg(short, long, env = "PDF2DOCX_LANG", default_value = "ch")]
    lang: TargetLanguage,

    /// Image width in the document: small (4in), medium (6in), large (8in).
    #[arg(short, long, env = "PDF2DOCX_SIZE", default_value = "medium")]
    size: ImageSize,

    /// Sharpen page images before OCR.
    #[arg(long, env = "PDF2DOCX_ENHANCE")]
    enhance: bool,

    /// Sharpening strength (1.0 = unchanged).
    #[arg(long, env = "PDF2DOCX_ENHANCE_FACTOR", default_value_t = 1.5)]
    enhance_factor: f32,

    /// Keep intermediate page images in temp_images/.
    #[arg(long, env = "PDF2DOCX_KEEP_IMAGES")]
    keep_images: bool,

    /// Append-only log file.
    #[arg(long, env = "PDF2DOCX_LOG_FILE", default_value = "app.log")]
    log_file: PathBuf,

    /// Disable the progress bar; print one line per status update instead.
    #[arg(long, env = "PDF2DOCX_NO_PROGRESS")]
    no_progress: bool,

    /// Also write debug logs to stderr.
    #[arg(short, long, env = "PDF2DOCX_VERBOSE")]
    verbose: bool,

    /// Print nothing but errors.
    #[arg(short, long, env = "PDF2DOCX_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", red("✘"), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    init_logging(&cli)?;

    // ── Configuration ────────────────────────────────────────────────────
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("cannot load configuration '{}'", cli.config.display()))?;
    let options = RunOptions::builder()
        .target_language(cli.lang)
        .image_size(cli.size)
        .enhance(cli.enhance)
        .enhance_factor(cli.enhance_factor)
        .keep_intermediates(cli.keep_images)
        .build()?;

    // ── Collaborators ────────────────────────────────────────────────────
    let pipeline = Pipeline::from_config(&config).context("cannot initialise the pipeline")?;

    if !cli.quiet {
        eprintln!(
            "{} {}  {}",
            cyan("◆"),
            bold(&format!("Converting {}", cli.input.display())),
            dim(&format!("→ {} · {:?}", options.target_language, options.image_size)),
        );
    }

    // ── Run on the worker, poll on this thread ───────────────────────────
    let (handle, receiver) = spawn_run(pipeline, cli.input.clone(), options)?;
    let mut renderer = Renderer::new(cli.quiet, !cli.no_progress && !cli.verbose);
    let state = ProgressMonitor::new(receiver)
        .poll_until_complete(DEFAULT_POLL_INTERVAL, |s| renderer.render(s));
    renderer.finish();

    let pipeline = handle.join()?;
    pipeline.shutdown();

    match state.outcome {
        Some(RunOutcome::Finished(summary)) => {
            if !cli.quiet {
                print_summary(&summary);
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(RunOutcome::Failed(message)) => {
            eprintln!("{} 处理过程中出错: {}", red("✘"), message);
            Ok(ExitCode::FAILURE)
        }
        None => {
            eprintln!("{} worker finished without a result", red("✘"));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_summary(summary: &RunSummary) {
    eprintln!(
        "{} {} pages  {}",
        green("✔"),
        bold(&summary.pages.to_string()),
        dim(&format!("{:.1}s", summary.duration_ms as f64 / 1000.0)),
    );
    if summary.ocr_failures + summary.empty_pages + summary.failed_chunks > 0 {
        eprintln!(
            "  {}",
            dim(&format!(
                "{} OCR failures · {} pages without text · {} chunks not translated",
                summary.ocr_failures, summary.empty_pages, summary.failed_chunks
            ))
        );
    }
    println!("{}", summary.output_path.display());
}

/// File logging always; stderr logging with `--verbose`.
fn init_logging(cli: &Cli) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cli.log_file)
        .with_context(|| format!("cannot open log file '{}'", cli.log_file.display()))?;
    let file = Mutex::new(file);

    let writer = if cli.verbose {
        BoxMakeWriter::new(file.and(io::stderr))
    } else {
        BoxMakeWriter::new(file)
    };
    let filter = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(())
}
