//! Translation prompts and the fixed strings written into output documents.
//!
//! Centralising every prompt and placeholder here keeps the wording in one
//! place: changing the translation persona, the "no content" marker, or the
//! slide naming scheme requires editing exactly this file. Unit tests import
//! the constants directly instead of repeating literals.

/// System message fixing the translator persona and direction (Chinese ↔ target).
pub const TRANSLATOR_SYSTEM_PROMPT: &str = "你是一个中英文翻译专家，将用户输入的中文翻译成英文，或将用户输入的英文翻译成中文。对于非中文内容，它将提供中文翻译结果。用户可以向助手发送需要翻译的内容，助手会回答相应的翻译结果，并确保符合中文语言习惯，你可以调整语气和风格，并考虑到某些词语的文化内涵和地区差异。同时作为翻译家，需将原文翻译成具有信达雅标准的译文。\"信\" 即忠实于原文的内容与意图；\"达\" 意味着译文应通顺易懂，表达清晰；\"雅\" 则追求译文的文化审美和语言的优美。目标是创作出既忠于原作精神，又符合目标语言文化和读者审美的翻译。";

/// Build the user message embedding the exact text and the target language.
pub fn translation_instruction(text: &str, language_name: &str) -> String {
    format!("请专业准确地翻译成{language_name}，保留所有数字和格式：\n{text}")
}

// ── Document strings ─────────────────────────────────────────────────────

/// Placeholder for pages where OCR failed or found nothing.
pub const NO_CONTENT_PLACEHOLDER: &str = "（无识别内容）";

/// Placeholder for a translation chunk that failed after its retries.
pub const TRANSLATION_FAILED_PLACEHOLDER: &str = "（翻译失败）";

/// Prefix of the line carrying the recognised text.
pub const ORIGINAL_LABEL: &str = "原文";

/// Prefix of the line carrying the translation.
pub const TRANSLATION_LABEL: &str = "翻译";

/// Stem prefix of ordered slide images, e.g. `幻灯片 01.png`.
pub const SLIDE_PREFIX: &str = "幻灯片";

/// Suffix appended to the source PDF file name to form the output name.
pub const OUTPUT_SUFFIX: &str = "转换结果.docx";

/// Name of the scratch directory created beside the source PDF.
pub const SCRATCH_DIR_NAME: &str = "temp_images";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_embeds_text_and_language() {
        let msg = translation_instruction("Revenue grew 12%.", "中文");
        assert!(msg.contains("中文"));
        assert!(msg.ends_with("\nRevenue grew 12%."));
    }

    #[test]
    fn placeholders_are_distinct() {
        assert_ne!(NO_CONTENT_PLACEHOLDER, TRANSLATION_FAILED_PLACEHOLDER);
    }
}
