//! The page pipeline: one synchronous run from PDF to saved document.
//!
//! ## Why synchronous?
//!
//! A run processes one page at a time and every stage blocks on something
//! external (pdfium, tesseract, the translation endpoint, the disk). Nothing
//! is gained from an async runtime, so the whole run lives on one worker
//! thread (see [`crate::worker`]) and reports through a
//! [`ProgressReporter`] instead of returning early.
//!
//! ## States
//!
//! ```text
//! Rasterizing → (Enhancing)? → Ordering → Page{OCR → Translating}×N → Assembling → Done
//!        └──────────────┴───────────┴──────────────┴───────────────────┴──▶ Failed
//! ```
//!
//! Any `Err(Pdf2DocxError)` moves the run to `Failed`. OCR and translation
//! failures are page- and chunk-local and never do. Only `Assembling`
//! writes the output document, so a failed run leaves none behind.

use crate::config::{AppConfig, RunOptions};
use crate::error::Pdf2DocxError;
use crate::pipeline::assemble::{layout, DocumentWriter, DocxWriter, PageRecord, PageText, TranslatedText};
use crate::pipeline::enhance::enhance_file;
use crate::pipeline::input::{output_path_for, scratch_dir_for, validate_pdf};
use crate::pipeline::ocr::{OcrEngine, TesseractEngine};
use crate::pipeline::order::{assign_slide_ids, OrderedPage, RasterPage};
use crate::pipeline::postprocess::clean_recognized;
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::pipeline::translate::TranslationClient;
use crate::progress::{PageStep, ProgressPlan, ProgressReporter, ProgressTracker, Stage};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output_path: PathBuf,
    pub pages: usize,
    /// Pages where OCR failed.
    pub ocr_failures: usize,
    /// Pages where OCR found no text.
    pub empty_pages: usize,
    /// Translation chunks replaced by the failure placeholder.
    pub failed_chunks: usize,
    pub duration_ms: u64,
}

/// Where a run currently is. Logged with every fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Validating,
    Rasterizing,
    Enhancing { page: usize },
    Ordering,
    Recognizing { page: usize },
    Translating { page: usize },
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Validating => write!(f, "validating"),
            RunState::Rasterizing => write!(f, "rasterizing"),
            RunState::Enhancing { page } => write!(f, "enhancing page {page}"),
            RunState::Ordering => write!(f, "ordering"),
            RunState::Recognizing { page } => write!(f, "recognizing page {page}"),
            RunState::Translating { page } => write!(f, "translating page {page}"),
            RunState::Assembling => write!(f, "assembling"),
            RunState::Done => write!(f, "done"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// The collaborators a [`Pipeline`] drives.
pub struct Collaborators {
    pub rasterizer: Box<dyn Rasterizer>,
    pub ocr: Box<dyn OcrEngine>,
    pub translator: TranslationClient,
    pub writer: Box<dyn DocumentWriter>,
}

/// Long-lived pipeline: constructed once, reused for runs, shut down once.
pub struct Pipeline {
    rasterizer: Box<dyn Rasterizer>,
    ocr: Box<dyn OcrEngine>,
    translator: TranslationClient,
    writer: Box<dyn DocumentWriter>,
    dpi: u32,
}

impl Pipeline {
    pub fn new(parts: Collaborators, dpi: u32) -> Self {
        Self {
            rasterizer: parts.rasterizer,
            ocr: parts.ocr,
            translator: parts.translator,
            writer: parts.writer,
            dpi,
        }
    }

    /// Build the production pipeline: pdfium, tesseract, HTTP translation
    /// and the docx writer. Fails if the OCR engine or HTTP client cannot be
    /// created.
    pub fn from_config(config: &AppConfig) -> Result<Self, Pdf2DocxError> {
        let ocr = TesseractEngine::new(&config.ocr_settings)?;
        let translator = TranslationClient::new(&config.api_config)?;
        Ok(Self::new(
            Collaborators {
                rasterizer: Box::new(PdfiumRasterizer::new(config.poppler_config.path.clone())),
                ocr: Box::new(ocr),
                translator,
                writer: Box::new(DocxWriter),
            },
            config.ocr_settings.dpi,
        ))
    }

    /// Release the OCR engine.
    pub fn shutdown(mut self) {
        info!("Shutting down pipeline ({})", self.ocr.name());
        self.ocr.shutdown();
    }

    /// Convert `pdf_path` into a bilingual document.
    ///
    /// # Errors
    /// Returns `Err(Pdf2DocxError)` only for fatal errors: invalid input,
    /// rasterisation, enhancement, renaming, or saving the document. Pages
    /// whose OCR or translation fails are recorded with placeholders.
    pub fn run(
        &self,
        pdf_path: impl AsRef<Path>,
        options: &RunOptions,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunSummary, Pdf2DocxError> {
        let pdf_path = pdf_path.as_ref();
        let start = Instant::now();
        let mut tracker = ProgressTracker::new(ProgressPlan::for_run(options.enhance), reporter);
        let mut state = RunState::Validating;

        info!("Starting run: {}", pdf_path.display());
        match self.run_stages(pdf_path, options, &mut tracker, &mut state) {
            Ok(mut summary) => {
                state = RunState::Done;
                summary.duration_ms = start.elapsed().as_millis() as u64;
                info!(
                    "Run {}: {} pages, {} OCR failures, {} empty, {} failed chunks, {}ms",
                    state,
                    summary.pages,
                    summary.ocr_failures,
                    summary.empty_pages,
                    summary.failed_chunks,
                    summary.duration_ms
                );
                tracker.complete("处理完成！");
                Ok(summary)
            }
            Err(e) => {
                let failed_at = std::mem::replace(&mut state, RunState::Failed);
                error!(stage = %failed_at, percent = tracker.last_percent(), "处理过程中出错: {}", e);
                debug!("Run state → {}", state);
                Err(e)
            }
        }
    }

    fn run_stages(
        &self,
        pdf_path: &Path,
        options: &RunOptions,
        tracker: &mut ProgressTracker<'_>,
        state: &mut RunState,
    ) -> Result<RunSummary, Pdf2DocxError> {
        // ── Step 1: Validate input ───────────────────────────────────────
        let pdf_path = validate_pdf(pdf_path)?;
        let scratch = scratch_dir_for(&pdf_path);
        let output_path = output_path_for(&pdf_path);

        // ── Step 2: Rasterise ────────────────────────────────────────────
        *state = RunState::Rasterizing;
        tracker.stage(Stage::Rasterize, 0, 1, "正在转换PDF为图片...");
        std::fs::create_dir_all(&scratch).map_err(|source| Pdf2DocxError::ScratchDir {
            path: scratch.clone(),
            source,
        })?;
        let pages = self.rasterize_to_disk(&pdf_path, &scratch)?;
        let total = pages.len();
        tracker.stage(Stage::Rasterize, 1, 1, format!("共转换出 {total} 张图片"));

        // ── Step 3: Enhance (optional) ───────────────────────────────────
        let pages = if options.enhance {
            enhance_pages(pages, options, tracker, state)?
        } else {
            pages
        };

        // ── Step 4: Assign slide order ───────────────────────────────────
        *state = RunState::Ordering;
        tracker.stage(Stage::Order, 0, total, "正在重命名图片...");
        let ordered = assign_slide_ids(pages, |done, total| {
            tracker.stage(Stage::Order, done, total, format!("重命名图片 {done}/{total}"));
        })?;

        // ── Step 5: OCR → translate → record, page by page ───────────────
        let mut summary = RunSummary {
            output_path: output_path.clone(),
            pages: total,
            ocr_failures: 0,
            empty_pages: 0,
            failed_chunks: 0,
            duration_ms: 0,
        };
        tracker.message(format!("开始处理 {total} 张图片..."));
        let mut records = Vec::with_capacity(total);
        for (i, page) in ordered.iter().enumerate() {
            let n = i + 1;
            records.push(self.process_page(page, n, total, options, tracker, state, &mut summary));
        }

        // ── Step 6: Assemble and save ────────────────────────────────────
        *state = RunState::Assembling;
        tracker.stage(Stage::Finalize, 0, 1, "正在生成文档...");
        let blocks = layout(&records);
        self.writer
            .write(&blocks, options.image_size.width_inches(), &output_path)?;
        info!("文档已保存到: {}", output_path.display());

        // ── Step 7: Clean up intermediates ───────────────────────────────
        if !options.keep_intermediates {
            remove_intermediates(&scratch, &ordered);
        }
        tracker.stage(Stage::Finalize, 1, 1, "文档已生成完成");

        Ok(summary)
    }

    /// Rasterise and save every page as `temp_page_<n>.png`.
    fn rasterize_to_disk(&self, pdf_path: &Path, scratch: &Path) -> Result<Vec<RasterPage>, Pdf2DocxError> {
        let images = self.rasterizer.rasterize(pdf_path, self.dpi)?;
        if images.is_empty() {
            return Err(Pdf2DocxError::EmptyDocument {
                path: pdf_path.to_path_buf(),
            });
        }

        let mut pages = Vec::with_capacity(images.len());
        for (i, image) in images.into_iter().enumerate() {
            let index = i + 1;
            let path = scratch.join(format!("temp_page_{index}.png"));
            image
                .save_with_format(&path, image::ImageFormat::Png)
                .map_err(|e| Pdf2DocxError::PageSaveFailed {
                    page: index,
                    path: path.clone(),
                    detail: e.to_string(),
                })?;
            debug!("Saved page {} → {}", index, path.display());
            pages.push(RasterPage { index, path });
        }
        Ok(pages)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_page(
        &self,
        page: &OrderedPage,
        n: usize,
        total: usize,
        options: &RunOptions,
        tracker: &mut ProgressTracker<'_>,
        state: &mut RunState,
        summary: &mut RunSummary,
    ) -> PageRecord {
        // OCR
        *state = RunState::Recognizing { page: n };
        tracker.message(format!("图片 {n}/{total}: 正在进行OCR识别..."));
        let original = match self.ocr.recognize(&page.path, n) {
            Ok(raw) => {
                let text = clean_recognized(&raw);
                if text.is_empty() {
                    summary.empty_pages += 1;
                    PageText::Empty
                } else {
                    PageText::Recognized(text)
                }
            }
            Err(e) => {
                warn!(page = n, "OCR识别失败: {}", e);
                summary.ocr_failures += 1;
                PageText::OcrFailed
            }
        };
        tracker.page(n, total, PageStep::Recognized, format!("图片 {n}/{total}: OCR识别完成"));

        // Translate
        let translated = match original.as_text() {
            Some(text) => {
                *state = RunState::Translating { page: n };
                tracker.message(format!("图片 {n}/{total}: 正在翻译..."));
                let result = self.translator.translate_in_chunks(text, options.target_language);
                if result.all_failed() {
                    warn!(page = n, chunks = result.chunks, "No chunk of the page could be translated");
                } else if !result.failed.is_empty() {
                    warn!(
                        page = n,
                        "{} of {} chunks failed to translate",
                        result.failed.len(),
                        result.chunks
                    );
                }
                summary.failed_chunks += result.failed.len();
                TranslatedText::Translated(result.text)
            }
            None => TranslatedText::Skipped,
        };
        tracker.page(n, total, PageStep::Translated, format!("图片 {n}/{total}: 翻译完成"));

        // Record
        let record = PageRecord {
            slide: page.slide,
            heading: page.heading(),
            image_path: page.path.clone(),
            original,
            translated,
        };
        tracker.page(n, total, PageStep::Recorded, format!("正在处理: {n}/{total}"));
        record
    }
}

/// Sharpen every page into `enhanced_page_<n>.png`, deleting the source
/// unless intermediates are kept.
fn enhance_pages(
    pages: Vec<RasterPage>,
    options: &RunOptions,
    tracker: &mut ProgressTracker<'_>,
    state: &mut RunState,
) -> Result<Vec<RasterPage>, Pdf2DocxError> {
    let total = pages.len();
    let mut enhanced = Vec::with_capacity(total);

    for (i, page) in pages.into_iter().enumerate() {
        *state = RunState::Enhancing { page: page.index };
        let dst = page
            .path
            .with_file_name(format!("enhanced_page_{}.png", page.index));
        enhance_file(&page.path, &dst, options.enhance_factor).map_err(|e| {
            Pdf2DocxError::EnhancementFailed {
                page: page.index,
                detail: e.to_string(),
            }
        })?;
        if !options.keep_intermediates {
            if let Err(e) = std::fs::remove_file(&page.path) {
                warn!(page = page.index, "Cannot remove {}: {}", page.path.display(), e);
            }
        }
        enhanced.push(RasterPage {
            index: page.index,
            path: dst,
        });
        tracker.stage(Stage::Enhance, i + 1, total, format!("增强图片 {}/{}", i + 1, total));
    }

    Ok(enhanced)
}

/// Delete the slide images and, if nothing else is left, the scratch
/// directory. Failures are logged, never fatal: the document is already
/// saved.
fn remove_intermediates(scratch: &Path, pages: &[OrderedPage]) {
    for page in pages {
        if let Err(e) = std::fs::remove_file(&page.path) {
            warn!("Cannot remove {}: {}", page.path.display(), e);
        }
    }
    match std::fs::remove_dir(scratch) {
        Ok(()) => debug!("Removed scratch directory {}", scratch.display()),
        Err(e) => debug!("Scratch directory {} kept: {}", scratch.display(), e),
    }
}
