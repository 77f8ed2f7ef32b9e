//! Background worker: runs a [`Pipeline`] off the presentation thread.
//!
//! ```rust,no_run
//! use edgequake_pdf2docx::{AppConfig, Pipeline, RunOptions, worker, channel::ProgressMonitor};
//!
//! let config = AppConfig::load("config.json")?;
//! let pipeline = Pipeline::from_config(&config)?;
//! let (handle, receiver) = worker::spawn_run(pipeline, "deck.pdf", RunOptions::default())?;
//!
//! let state = ProgressMonitor::new(receiver)
//!     .poll_until_complete(edgequake_pdf2docx::channel::DEFAULT_POLL_INTERVAL, |s| {
//!         eprintln!("{:5.1}% {}", s.percent, s.message);
//!     });
//!
//! let pipeline = handle.join()?;
//! pipeline.shutdown();
//! # let _ = state;
//! # Ok::<(), edgequake_pdf2docx::Pdf2DocxError>(())
//! ```

use crate::channel::{progress_channel, ProgressReceiver};
use crate::config::RunOptions;
use crate::convert::Pipeline;
use crate::error::Pdf2DocxError;
use std::path::PathBuf;
use std::thread::JoinHandle;
use tracing::debug;

const WORKER_THREAD_NAME: &str = "pdf2docx-worker";

/// Handle to a running conversion.
pub struct RunHandle {
    thread: JoinHandle<Pipeline>,
}

impl RunHandle {
    /// Wait for the worker and take the pipeline back so its OCR engine can
    /// be shut down. The run's own result travels over the progress channel.
    pub fn join(self) -> Result<Pipeline, Pdf2DocxError> {
        self.thread
            .join()
            .map_err(|_| Pdf2DocxError::Internal("worker thread panicked".into()))
    }
}

/// Start one run of `pipeline` on a dedicated thread.
///
/// The worker is the sole producer on the returned receiver's channel; it
/// publishes progress events and then exactly one terminal message.
pub fn spawn_run(
    pipeline: Pipeline,
    pdf_path: impl Into<PathBuf>,
    options: RunOptions,
) -> Result<(RunHandle, ProgressReceiver), Pdf2DocxError> {
    let pdf_path = pdf_path.into();
    let (sender, receiver) = progress_channel();

    let thread = std::thread::Builder::new()
        .name(WORKER_THREAD_NAME.into())
        .spawn(move || {
            debug!("Worker started for {}", pdf_path.display());
            let result = pipeline.run(&pdf_path, &options, &sender);
            sender.finish(&result);
            pipeline
        })
        .map_err(|e| Pdf2DocxError::Internal(format!("cannot spawn worker thread: {e}")))?;

    Ok((RunHandle { thread }, receiver))
}
