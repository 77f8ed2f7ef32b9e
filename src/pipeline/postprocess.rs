//! Post-processing: deterministic cleanup of OCR output and translations.
//!
//! ## Why is post-processing necessary?
//!
//! Both collaborators produce text that is correct in content but awkward to
//! write into a document paragraph:
//!
//! - tesseract emits `\f` page feeds, trailing spaces and runs of blank lines
//! - chat models occasionally wrap the whole answer in a ```` ``` ```` fence
//!   even though they were only asked to translate
//! - either side may carry zero-width characters or a BOM
//! - Windows-style `\r\n` line endings leak through from both
//!
//! Each rule is a pure `&str → String` pass and is tested on its own.
//!
//! ## Rule Order
//!
//! Fences are stripped first so the fence lines do not survive as text.
//! Line endings are normalised before per-line trimming so `\r` is not
//! mistaken for content.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean text returned by the OCR engine.
///
/// 1. Normalise line endings (CRLF/CR/form feed → LF)
/// 2. Strip invisible Unicode
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive newlines down to one blank line
/// 5. Trim the whole text
///
/// A page whose text is whitespace only comes out empty, which the pipeline
/// treats as "nothing detected".
pub fn clean_recognized(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

/// Clean one translated chunk returned by the model.
///
/// 1. Strip an outer code fence wrapped around the whole answer
/// 2. Normalise line endings
/// 3. Strip invisible Unicode
/// 4. Trim trailing whitespace per line, then the whole text
pub fn clean_translation(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    s.trim().to_string()
}

// ── Rule: Strip outer code fence ─────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule: Normalise line endings ─────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
}

// ── Rule: Trim trailing whitespace per line ──────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule: Collapse blank-line runs ───────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Rule: Remove invisible Unicode ───────────────────────────────────────────
//
// Zero-width spaces, joiners, BOM and soft hyphens render as nothing but
// break search and copy-paste in the output document.

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fence_with_language() {
        let input = "```text\n你好。\n```";
        assert_eq!(strip_outer_fence(input), "你好。");
    }

    #[test]
    fn test_strip_fence_without_language() {
        assert_eq!(strip_outer_fence("```\nline 1\nline 2\n```\n"), "line 1\nline 2");
    }

    #[test]
    fn test_inner_fence_is_kept() {
        let input = "Use this:\n```\ncode\n```";
        assert_eq!(strip_outer_fence(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc\u{000C}d"), "a\nb\nc\nd");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("a   \nb\t\nc"), "a\nb\nc");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(remove_invisible_chars("\u{FEFF}Hel\u{200B}lo"), "Hello");
    }

    #[test]
    fn test_clean_recognized() {
        let raw = "Quarterly  \r\nResults\n\n\n\n\u{000C}";
        assert_eq!(clean_recognized(raw), "Quarterly\nResults");
    }

    #[test]
    fn test_whitespace_only_ocr_is_empty() {
        assert_eq!(clean_recognized(" \n\u{000C}\n "), "");
    }

    #[test]
    fn test_clean_translation() {
        let raw = "```\n你好。  \r\n世界\u{200B}\n```";
        assert_eq!(clean_translation(raw), "你好。\n世界");
    }
}
