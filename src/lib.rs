//! # edgequake-pdf2docx
//!
//! Turn a PDF (typically an exported slide deck) into a bilingual Word
//! document: every page as an image, followed by its recognised text and a
//! translation.
//!
//! ## Why this crate?
//!
//! Slide exports are images of text. Copying text out of them is unreliable
//! and translating them by hand is slow. This crate rasterises each page,
//! optionally sharpens it, reads it with OCR, sends the text through a
//! streaming chat-completions endpoint in sentence-sized chunks, and writes a
//! `.docx` the reader can review page by page next to the original image.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      check the %PDF header, derive scratch/output paths
//!  ├─ 2. Render     rasterise every page via pdfium
//!  ├─ 3. Enhance    optional 3×3 sharpening
//!  ├─ 4. Order      name pages 幻灯片 01, 02, … by position
//!  ├─ 5. OCR        tesseract, one page at a time
//!  ├─ 6. Translate  chunk → rate-limit → stream → retry on timeout
//!  └─ 7. Assemble   heading + image + original + translation per page
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2docx::{AppConfig, NoopReporter, Pipeline, RunOptions, TargetLanguage};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load("config.json")?;
//!     let pipeline = Pipeline::from_config(&config)?;
//!     let options = RunOptions::builder()
//!         .target_language(TargetLanguage::Chinese)
//!         .enhance(true)
//!         .build()?;
//!     let summary = pipeline.run("deck.pdf", &options, &NoopReporter)?;
//!     eprintln!("saved {}", summary.output_path.display());
//!     pipeline.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! For interactive use run the pipeline with [`worker::spawn_run`] and poll
//! the returned receiver with a [`channel::ProgressMonitor`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2docx` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2docx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod channel;
pub mod config;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod worker;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use channel::{progress_channel, DisplayState, ProgressMonitor, ProgressReceiver, ProgressSender, RunOutcome};
pub use config::{ApiConfig, AppConfig, ImageSize, OcrSettings, RasterizerConfig, RunOptions, RunOptionsBuilder, TargetLanguage};
pub use convert::{Collaborators, Pipeline, RunState, RunSummary};
pub use error::{OcrError, Pdf2DocxError, TranslateError};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter};
pub use worker::{spawn_run, RunHandle};
