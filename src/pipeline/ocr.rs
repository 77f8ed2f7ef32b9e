//! OCR collaborator.
//!
//! The engine is constructed once at startup, injected into the
//! [`Pipeline`](crate::convert::Pipeline), reused for every page, and
//! released through [`OcrEngine::shutdown`] when the pipeline is shut down.
//!
//! Recognition distinguishes two outcomes the document later renders the
//! same way: `Err(OcrError)` means the engine failed on that page, `Ok("")`
//! means it ran and found nothing.

use crate::config::OcrSettings;
use crate::error::{OcrError, Pdf2DocxError};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Extracts text from one page image.
pub trait OcrEngine: Send {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Recognise the text of the image at `image`. `page` is the 1-based
    /// page index used in error context.
    fn recognize(&self, image: &Path, page: usize) -> Result<String, OcrError>;

    /// Release engine resources. Called once, after the last page.
    fn shutdown(&mut self) {}
}

/// [`OcrEngine`] wrapping the `tesseract` command-line tool.
#[derive(Debug)]
pub struct TesseractEngine {
    program: PathBuf,
    language: String,
    /// Set once [`OcrEngine::shutdown`] has run.
    released: bool,
}

impl TesseractEngine {
    /// Probe the executable and build the engine.
    ///
    /// Fails with [`Pdf2DocxError::OcrUnavailable`] when `tesseract --version`
    /// cannot be run, so a missing engine is reported at startup instead of
    /// as a failure on every page.
    pub fn new(settings: &OcrSettings) -> Result<Self, Pdf2DocxError> {
        let program = settings
            .engine_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("tesseract"));

        let output = Command::new(&program)
            .arg("--version")
            .output()
            .map_err(|e| {
                Pdf2DocxError::OcrUnavailable(format!("cannot run {}: {e}", program.display()))
            })?;
        if !output.status.success() {
            return Err(Pdf2DocxError::OcrUnavailable(format!(
                "{} --version exited with {}",
                program.display(),
                output.status
            )));
        }

        // tesseract prints its banner on stdout or stderr depending on version.
        let banner = String::from_utf8_lossy(if output.stdout.is_empty() {
            &output.stderr
        } else {
            &output.stdout
        });
        info!(
            "OCR engine ready: {} (language {})",
            banner.lines().next().unwrap_or("tesseract").trim(),
            settings.language
        );

        Ok(Self {
            program,
            language: settings.language.clone(),
            released: false,
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &Path, page: usize) -> Result<String, OcrError> {
        let output = Command::new(&self.program)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| OcrError::Spawn {
                page,
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(page, "tesseract failed: {}", stderr);
            return Err(OcrError::Engine {
                page,
                status: output.status.to_string(),
                stderr,
            });
        }

        let text = String::from_utf8(output.stdout).map_err(|_| OcrError::InvalidOutput { page })?;
        debug!(page, chars = text.chars().count(), "tesseract finished");
        Ok(text)
    }

    fn shutdown(&mut self) {
        if !self.released {
            self.released = true;
            info!("OCR engine released");
        }
    }
}
