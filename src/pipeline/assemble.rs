//! Document assembly: page records → layout blocks → `.docx`.
//!
//! Layout and writing are split. [`layout`] turns records into the block
//! sequence every output follows (heading, image, original line, translated
//! line, blank separator), and a [`DocumentWriter`] renders those blocks.
//! Tests assert on blocks without unpacking a docx archive.
//!
//! The writer saves to a sibling `.part` file and renames it into place, so
//! a failed save never leaves a truncated document at the output path.

use crate::error::Pdf2DocxError;
use crate::pipeline::order::SlideId;
use crate::prompts::{NO_CONTENT_PLACEHOLDER, ORIGINAL_LABEL, TRANSLATION_LABEL};
use docx_rs::{BreakType, Docx, Paragraph, Pic, Run};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// English Metric Units per inch.
const EMU_PER_INCH: f32 = 914_400.0;

/// Highlight colour of slide headings.
const HEADING_HIGHLIGHT: &str = "yellow";

/// Recognised text of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageText {
    Recognized(String),
    /// OCR ran and found nothing.
    Empty,
    /// OCR failed on this page.
    OcrFailed,
}

impl PageText {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PageText::Recognized(t) => Some(t),
            PageText::Empty | PageText::OcrFailed => None,
        }
    }
}

/// Translation attached to a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslatedText {
    /// Chunk results joined in order; failed chunks carry the failure
    /// placeholder.
    Translated(String),
    /// Nothing to translate.
    Skipped,
}

/// Everything the document needs for one page. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub slide: SlideId,
    /// Heading text, the slide image's file stem.
    pub heading: String,
    pub image_path: PathBuf,
    pub original: PageText,
    pub translated: TranslatedText,
}

impl PageRecord {
    /// Original text or the "no content" placeholder.
    pub fn original_text(&self) -> &str {
        self.original.as_text().unwrap_or(NO_CONTENT_PLACEHOLDER)
    }

    /// Translation or the "no content" placeholder.
    pub fn translated_text(&self) -> &str {
        match &self.translated {
            TranslatedText::Translated(t) => t,
            TranslatedText::Skipped => NO_CONTENT_PLACEHOLDER,
        }
    }
}

/// One element of the output document.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(String),
    Image(PathBuf),
    Paragraph(String),
    Blank,
}

/// Lay records out in slide order.
pub fn layout(records: &[PageRecord]) -> Vec<Block> {
    let mut ordered: Vec<&PageRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.slide);

    let mut blocks = Vec::with_capacity(records.len() * 5);
    for record in ordered {
        blocks.push(Block::Heading(record.heading.clone()));
        blocks.push(Block::Image(record.image_path.clone()));
        blocks.push(Block::Paragraph(format!(
            "{ORIGINAL_LABEL}: {}",
            record.original_text()
        )));
        blocks.push(Block::Paragraph(format!(
            "{TRANSLATION_LABEL}: {}",
            record.translated_text()
        )));
        blocks.push(Block::Blank);
    }
    blocks
}

/// Renders layout blocks to a durable document.
pub trait DocumentWriter: Send {
    /// Write `blocks` to `path`, scaling images to `image_width_inches`.
    fn write(&self, blocks: &[Block], image_width_inches: f32, path: &Path) -> Result<(), Pdf2DocxError>;
}

/// [`DocumentWriter`] producing Office Open XML via docx-rs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxWriter;

impl DocxWriter {
    fn image_paragraph(path: &Path, width_inches: f32, out: &Path) -> Result<Paragraph, Pdf2DocxError> {
        let save_err = |detail: String| Pdf2DocxError::DocumentSave {
            path: out.to_path_buf(),
            detail,
        };

        let bytes = std::fs::read(path)
            .map_err(|e| save_err(format!("cannot read image '{}': {e}", path.display())))?;
        let (w, h) = image::load_from_memory(&bytes)
            .map(|img| (img.width(), img.height()))
            .map_err(|e| save_err(format!("cannot decode image '{}': {e}", path.display())))?;

        let width_emu = (width_inches * EMU_PER_INCH).round();
        let height_emu = if w == 0 {
            0.0
        } else {
            (width_emu * h as f32 / w as f32).round()
        };
        debug!(
            "Embedding {} at {:.1}in ({}x{} px)",
            path.display(),
            width_inches,
            w,
            h
        );

        let pic = Pic::new(&bytes).size(width_emu as u32, height_emu as u32);
        Ok(Paragraph::new().add_run(Run::new().add_image(pic)))
    }

    fn text_paragraph(text: &str) -> Paragraph {
        let mut run = Run::new();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                run = run.add_break(BreakType::TextWrapping);
            }
            run = run.add_text(line);
        }
        Paragraph::new().add_run(run)
    }
}

impl DocumentWriter for DocxWriter {
    fn write(&self, blocks: &[Block], image_width_inches: f32, path: &Path) -> Result<(), Pdf2DocxError> {
        let mut docx = Docx::new();
        for block in blocks {
            let paragraph = match block {
                Block::Heading(text) => Paragraph::new().add_run(
                    Run::new().add_text(text.as_str()).highlight(HEADING_HIGHLIGHT),
                ),
                Block::Image(image) => Self::image_paragraph(image, image_width_inches, path)?,
                Block::Paragraph(text) => Self::text_paragraph(text),
                Block::Blank => Paragraph::new(),
            };
            docx = docx.add_paragraph(paragraph);
        }

        let part = part_path(path);
        let save_err = |detail: String| Pdf2DocxError::DocumentSave {
            path: path.to_path_buf(),
            detail,
        };

        let result = std::fs::File::create(&part)
            .map_err(|e| save_err(e.to_string()))
            .and_then(|file| {
                docx.build()
                    .pack(file)
                    .map_err(|e| save_err(e.to_string()))
            })
            .and_then(|()| std::fs::rename(&part, path).map_err(|e| save_err(e.to_string())));

        if result.is_err() {
            let _ = std::fs::remove_file(&part);
        } else {
            info!("Document saved: {}", path.display());
        }
        result
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::TRANSLATION_FAILED_PLACEHOLDER;

    fn record(n: usize, original: PageText, translated: TranslatedText) -> PageRecord {
        let slide = SlideId::new(n);
        PageRecord {
            slide,
            heading: slide.file_stem(),
            image_path: PathBuf::from(format!("{}.png", slide.file_stem())),
            original,
            translated,
        }
    }

    #[test]
    fn layout_follows_the_page_template() {
        let blocks = layout(&[record(
            1,
            PageText::Recognized("Hello.".into()),
            TranslatedText::Translated("你好。".into()),
        )]);
        assert_eq!(
            blocks,
            [
                Block::Heading("幻灯片 01".into()),
                Block::Image(PathBuf::from("幻灯片 01.png")),
                Block::Paragraph("原文: Hello.".into()),
                Block::Paragraph("翻译: 你好。".into()),
                Block::Blank,
            ]
        );
    }

    #[test]
    fn empty_and_failed_ocr_render_the_same_placeholder() {
        let empty = record(1, PageText::Empty, TranslatedText::Skipped);
        let failed = record(1, PageText::OcrFailed, TranslatedText::Skipped);
        assert_ne!(empty.original, failed.original);
        assert_eq!(layout(&[empty]), layout(&[failed]));
        assert_eq!(
            layout(&[record(1, PageText::Empty, TranslatedText::Skipped)])[2],
            Block::Paragraph(format!("原文: {NO_CONTENT_PLACEHOLDER}"))
        );
    }

    #[test]
    fn failed_translation_text_is_written_verbatim() {
        let r = record(
            1,
            PageText::Recognized("A.".into()),
            TranslatedText::Translated(TRANSLATION_FAILED_PLACEHOLDER.into()),
        );
        assert_eq!(r.translated_text(), TRANSLATION_FAILED_PLACEHOLDER);
    }

    #[test]
    fn layout_sorts_by_slide() {
        let blocks = layout(&[
            record(2, PageText::Empty, TranslatedText::Skipped),
            record(1, PageText::Empty, TranslatedText::Skipped),
        ]);
        assert_eq!(blocks[0], Block::Heading("幻灯片 01".into()));
        assert_eq!(blocks[5], Block::Heading("幻灯片 02".into()));
    }

    #[test]
    fn docx_writer_saves_a_zip_package() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("幻灯片 01.png");
        image::RgbImage::from_pixel(20, 10, image::Rgb([255, 255, 255]))
            .save(&image_path)
            .unwrap();
        let out = dir.path().join("deck.pdf_转换结果.docx");

        let blocks = vec![
            Block::Heading("幻灯片 01".into()),
            Block::Image(image_path),
            Block::Paragraph("原文: line one\nline two".into()),
            Block::Paragraph("翻译: 你好。".into()),
            Block::Blank,
        ];
        DocxWriter.write(&blocks, 6.0, &out).unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert!(!part_path(&out).exists());
    }

    #[test]
    fn missing_image_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.docx");
        let blocks = vec![Block::Image(dir.path().join("missing.png"))];
        let err = DocxWriter.write(&blocks, 4.0, &out).unwrap_err();
        assert!(matches!(err, Pdf2DocxError::DocumentSave { .. }));
        assert!(!out.exists());
        assert!(!part_path(&out).exists());
    }
}
