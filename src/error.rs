//! Error types for the edgequake-pdf2docx library.
//!
//! Three error types mirror the three failure scopes of a run:
//!
//! * [`Pdf2DocxError`] is **fatal**: the run cannot continue (bad config,
//!   unreadable PDF, rasteriser missing, enhancement or rename failure,
//!   document save failure). The run moves to `Failed` and no output
//!   document is written.
//!
//! * [`OcrError`] is **page-local**: recognition failed for one page. The page
//!   is recorded with placeholders and the run moves on to the next page.
//!
//! * [`TranslateError`] is **chunk-local**: one translation chunk failed after
//!   its retry budget. Its slot gets the failure placeholder; sibling chunks
//!   and pages are unaffected.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2docx library.
#[derive(Debug, Error)]
pub enum Pdf2DocxError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// The configuration file could not be read.
    #[error("Cannot read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON or misses required keys.
    #[error("Malformed config file '{path}': {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    /// Builder or file validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Rasterisation errors ──────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set `poppler_config.path` in the config file to the directory that holds\n\
libpdfium (or pdfium.dll), or install pdfium as a system library.\n"
    )]
    PdfiumBindingFailed(String),

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The PDF rendered to zero pages.
    #[error("PDF '{path}' contains no pages")]
    EmptyDocument { path: PathBuf },

    // ── Stage errors ──────────────────────────────────────────────────────
    /// The scratch directory for intermediate images could not be prepared.
    #[error("Cannot prepare scratch directory '{path}': {source}")]
    ScratchDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a rasterised page to the scratch directory failed.
    #[error("Cannot save page {page} to '{path}': {detail}")]
    PageSaveFailed {
        page: usize,
        path: PathBuf,
        detail: String,
    },

    /// Sharpening one page failed; this aborts the whole run.
    #[error("Enhancement failed for page {page}: {detail}")]
    EnhancementFailed { page: usize, detail: String },

    /// Renaming a page to its slide name failed.
    #[error("Cannot rename '{from}' to '{to}': {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Collaborator errors ───────────────────────────────────────────────
    /// The OCR engine could not be started.
    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(String),

    /// The translation HTTP client could not be constructed.
    #[error("Cannot build translation client: {0}")]
    ClientBuild(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output document.
    #[error("Failed to save document '{path}': {detail}")]
    DocumentSave { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. the worker thread panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A page-local OCR failure. Never aborts the run.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    /// The engine process could not be spawned.
    #[error("Page {page}: cannot run OCR engine: {detail}")]
    Spawn { page: usize, detail: String },

    /// The engine ran but reported failure.
    #[error("Page {page}: OCR engine exited with {status}: {stderr}")]
    Engine {
        page: usize,
        status: String,
        stderr: String,
    },

    /// The engine produced bytes that are not UTF-8 text.
    #[error("Page {page}: OCR output is not valid UTF-8")]
    InvalidOutput { page: usize },
}

/// A chunk-local translation failure. Never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// Every attempt timed out.
    #[error("translation request timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// The endpoint answered with a non-success status code.
    #[error("translation request failed with HTTP status {code}")]
    Status { code: u16 },

    /// Connection-level failure other than a timeout.
    #[error("translation transport error: {0}")]
    Transport(String),

    /// The response stream could not be read.
    #[error("translation stream error: {0}")]
    Stream(String),
}

impl TranslateError {
    /// Only timeouts are worth another attempt; everything else fails fast.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TranslateError::Timeout { .. })
    }
}
