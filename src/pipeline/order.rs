//! Slide ordering: assign `NN` identifiers and rename pages to match.
//!
//! Identifiers come from enumeration order alone. A file called
//! `temp_page_07.png` that arrives first becomes slide `01`; digits embedded
//! in file names are never parsed.

use crate::error::Pdf2DocxError;
use crate::prompts::SLIDE_PREFIX;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Two-digit, 1-based display and ordering key of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlideId(usize);

impl SlideId {
    /// `position` is 1-based.
    pub fn new(position: usize) -> Self {
        Self(position)
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// File stem of the renamed image, e.g. `幻灯片 03`.
    pub fn file_stem(self) -> String {
        format!("{SLIDE_PREFIX} {self}")
    }
}

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// One rasterised page on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterPage {
    /// 1-based rasterisation index.
    pub index: usize,
    pub path: PathBuf,
}

/// A page after ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedPage {
    pub slide: SlideId,
    pub index: usize,
    pub path: PathBuf,
}

impl OrderedPage {
    /// Heading text shown above the page image.
    pub fn heading(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.slide.file_stem())
    }
}

/// Path a page is renamed to: `幻灯片 NN.<ext>` in the page's directory.
pub fn slide_path(page_path: &Path, slide: SlideId) -> PathBuf {
    let ext = page_path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    let dir = page_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}.{ext}", slide.file_stem()))
}

/// Assign identifiers `01..=N` in the given order and rename each file.
///
/// `on_renamed(done, total)` is called after every page. Pages already at
/// their target path are left alone, so running the stage twice is a no-op.
pub fn assign_slide_ids(
    pages: Vec<RasterPage>,
    mut on_renamed: impl FnMut(usize, usize),
) -> Result<Vec<OrderedPage>, Pdf2DocxError> {
    let total = pages.len();
    let mut ordered = Vec::with_capacity(total);

    for (pos, page) in pages.into_iter().enumerate() {
        let slide = SlideId::new(pos + 1);
        let target = slide_path(&page.path, slide);

        if page.path != target {
            std::fs::rename(&page.path, &target).map_err(|source| {
                Pdf2DocxError::RenameFailed {
                    from: page.path.clone(),
                    to: target.clone(),
                    source,
                }
            })?;
            debug!(
                "Slide {}: {} → {}",
                slide,
                page.path.display(),
                target.display()
            );
        }

        ordered.push(OrderedPage {
            slide,
            index: page.index,
            path: target,
        });
        on_renamed(pos + 1, total);
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, b"png").unwrap();
        p
    }

    #[test]
    fn slide_id_is_two_digits() {
        assert_eq!(SlideId::new(3).to_string(), "03");
        assert_eq!(SlideId::new(12).to_string(), "12");
        assert_eq!(SlideId::new(100).to_string(), "100");
        assert_eq!(SlideId::new(1).file_stem(), "幻灯片 01");
    }

    #[test]
    fn ids_follow_enumeration_not_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![
            RasterPage { index: 1, path: touch(dir.path(), "temp_page_07.png") },
            RasterPage { index: 2, path: touch(dir.path(), "x_01.png") },
            RasterPage { index: 3, path: touch(dir.path(), "page_3.png") },
        ];

        let ordered = assign_slide_ids(pages, |_, _| {}).unwrap();

        let ids: Vec<usize> = ordered.iter().map(|p| p.slide.get()).collect();
        assert_eq!(ids, [1, 2, 3]);
        let names: Vec<String> = ordered
            .iter()
            .map(|p| p.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["幻灯片 01.png", "幻灯片 02.png", "幻灯片 03.png"]);
        assert!(!dir.path().join("temp_page_07.png").exists());
        assert!(ordered.iter().all(|p| p.path.exists()));
        assert_eq!(ordered[0].heading(), "幻灯片 01");
    }

    #[test]
    fn reordering_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![
            RasterPage { index: 1, path: touch(dir.path(), "temp_page_1.png") },
            RasterPage { index: 2, path: touch(dir.path(), "temp_page_2.png") },
        ];
        let first = assign_slide_ids(pages, |_, _| {}).unwrap();
        let again: Vec<RasterPage> = first
            .iter()
            .map(|p| RasterPage { index: p.index, path: p.path.clone() })
            .collect();
        let second = assign_slide_ids(again, |_, _| {}).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn progress_callback_sees_every_page() {
        let dir = tempfile::tempdir().unwrap();
        let pages: Vec<RasterPage> = (1..=4)
            .map(|i| RasterPage { index: i, path: touch(dir.path(), &format!("temp_page_{i}.png")) })
            .collect();
        let mut seen = Vec::new();
        assign_slide_ids(pages, |done, total| seen.push((done, total))).unwrap();
        assert_eq!(seen, [(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[test]
    fn missing_file_is_a_rename_failure() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![RasterPage { index: 1, path: dir.path().join("gone.png") }];
        let err = assign_slide_ids(pages, |_, _| {}).unwrap_err();
        assert!(matches!(err, Pdf2DocxError::RenameFailed { .. }));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(assign_slide_ids(Vec::new(), |_, _| {}).unwrap().is_empty());
    }
}
