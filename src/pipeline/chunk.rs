//! Sentence-respecting text chunker.
//!
//! Text is cut after sentence terminators of either script (`。 . ! ? ！ ？`),
//! keeping the terminator with the sentence it ends. Fragments are then packed
//! greedily into chunks of at most `max_chars` characters. A single fragment
//! longer than the bound becomes its own oversize chunk; sentences are never
//! broken.
//!
//! Lengths are counted in `char`s, not bytes, so a 1000-character bound means
//! the same thing for ideographic and Latin text.

/// Characters that end a sentence fragment.
const TERMINATORS: &[char] = &['。', '.', '!', '?', '！', '？'];

fn is_terminator(c: char) -> bool {
    TERMINATORS.contains(&c)
}

/// Split `text` into sentence fragments. A run of terminators (`?!`, `...`)
/// stays with the fragment it ends. Concatenating the result gives back
/// `text` exactly.
fn sentence_fragments(text: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut prev_was_terminator = false;

    for (i, c) in text.char_indices() {
        let term = is_terminator(c);
        if prev_was_terminator && !term {
            fragments.push(&text[start..i]);
            start = i;
        }
        prev_was_terminator = term;
    }
    if start < text.len() {
        fragments.push(&text[start..]);
    }
    fragments
}

/// Split `text` into ordered chunks of at most `max_chars` characters.
///
/// Chunks are trimmed; whitespace-only chunks are dropped, so empty input
/// yields no chunks.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for fragment in sentence_fragments(text) {
        // `current` never starts with whitespace, so its length is what the
        // trimmed chunk would hold.
        if current_len > 0 && current_len + fragment.trim_end().chars().count() > max_chars {
            close(&mut current, &mut chunks);
            current_len = 0;
        }
        let piece = if current.is_empty() { fragment.trim_start() } else { fragment };
        current.push_str(piece);
        current_len += piece.chars().count();
    }
    close(&mut current, &mut chunks);

    chunks
}

fn close(current: &mut String, chunks: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}
