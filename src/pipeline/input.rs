//! Input validation and run-local paths.
//!
//! We check the PDF magic bytes (`%PDF`) before handing the file to the
//! rasteriser so callers get a meaningful error rather than a pdfium crash.
//! The scratch directory and output path are both derived from the source
//! location, so they are computed here as well.

use crate::error::Pdf2DocxError;
use crate::prompts::{OUTPUT_SUFFIX, SCRATCH_DIR_NAME};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` exists, is readable, and starts with `%PDF`.
pub fn validate_pdf(path: &Path) -> Result<PathBuf, Pdf2DocxError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(Pdf2DocxError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(Pdf2DocxError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2DocxError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2DocxError::FileNotFound { path });
        }
    }

    debug!("Validated source PDF: {}", path.display());
    Ok(path)
}

/// `temp_images/` beside the source PDF.
pub fn scratch_dir_for(pdf_path: &Path) -> PathBuf {
    parent_dir(pdf_path).join(SCRATCH_DIR_NAME)
}

/// `<pdf file name>_转换结果.docx` beside the scratch directory.
pub fn output_path_for(pdf_path: &Path) -> PathBuf {
    let file_name = pdf_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());
    parent_dir(pdf_path).join(format!("{file_name}_{OUTPUT_SUFFIX}"))
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
