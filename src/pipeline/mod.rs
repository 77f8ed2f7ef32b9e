//! Pipeline stages for PDF-to-bilingual-document conversion.
//!
//! Each submodule implements exactly one transformation step. The
//! collaborators that touch external tools or services (rasteriser, OCR
//! engine, chat transport, document writer) sit behind traits so the
//! orchestrator in [`crate::convert`] can be driven end-to-end by fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ enhance? ──▶ order ──▶ ocr ──▶ translate ──▶ assemble
//! (%PDF)    (pdfium)   (sharpen)   (NN ids)  (tess)  (chunk+retry)  (docx)
//! ```
//!
//! 1. [`input`]: validate the source and derive scratch/output paths
//! 2. [`render`]: rasterise every page at the configured DPI
//! 3. [`enhance`]: optional sharpening pass over the saved pages
//! 4. [`order`]: assign slide identifiers by enumeration order, rename
//! 5. [`ocr`]: recognise each page's text; failures are page-local
//! 6. [`translate`]: chunked, rate-limited streaming translation
//!    ([`chunk`], [`rate_limit`] and [`postprocess`] support it)
//! 7. [`assemble`]: lay out page records and write the document

pub mod assemble;
pub mod chunk;
pub mod enhance;
pub mod input;
pub mod ocr;
pub mod order;
pub mod postprocess;
pub mod rate_limit;
pub mod render;
pub mod translate;
