//! Small pure text helpers.
//!
//! Offsets exposed to hosts are character offsets, never byte offsets; these
//! helpers do the conversion so callers cannot split a UTF-8 sequence.

/// Number of `char`s in `s`.
#[must_use]
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the `char_idx`-th character, or `None` when out of range.
///
/// `char_idx == char_len(s)` maps to `s.len()`.
#[must_use]
pub fn byte_offset_of_char(s: &str, char_idx: usize) -> Option<usize> {
    if char_idx == 0 {
        return Some(0);
    }
    let mut count = 0;
    for (byte, _) in s.char_indices() {
        if count == char_idx {
            return Some(byte);
        }
        count += 1;
    }
    (count == char_idx).then_some(s.len())
}

/// Replace characters `[start, end)` of `full` with `replacement`.
///
/// Returns `None` for an inverted or out-of-range span.
#[must_use]
pub fn splice_chars(full: &str, start: usize, end: usize, replacement: &str) -> Option<String> {
    if start > end {
        return None;
    }
    let start_byte = byte_offset_of_char(full, start)?;
    let end_byte = byte_offset_of_char(full, end)?;
    let mut out = String::with_capacity(full.len() - (end_byte - start_byte) + replacement.len());
    out.push_str(&full[..start_byte]);
    out.push_str(replacement);
    out.push_str(&full[end_byte..]);
    Some(out)
}

/// Text before the last occurrence of `needle`, trimmed. The whole input (trimmed)
/// when `needle` does not occur.
#[must_use]
pub fn substring_before_last<'a>(text: &'a str, needle: &str) -> &'a str {
    match text.rfind(needle) {
        Some(idx) => text[..idx].trim(),
        None => text.trim(),
    }
}

/// Strip `suffix` from the trimmed `text`, then trim what is left.
#[must_use]
pub fn strip_suffix_trimmed<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    text.trim().strip_suffix(suffix).map(str::trim)
}

/// Remove every ASCII-case-insensitive occurrence of `needle` from `text`.
#[must_use]
pub fn remove_ignore_ascii_case(text: &str, needle: &str) -> String {
    if needle.is_empty() {
        return text.to_string();
    }
    let lower_text = text.to_ascii_lowercase();
    let lower_needle = needle.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    // ASCII lowercasing preserves byte offsets, so indices map back onto `text`.
    while let Some(found) = lower_text[cursor..].find(&lower_needle) {
        let at = cursor + found;
        out.push_str(&text[cursor..at]);
        cursor = at + needle.len();
    }
    out.push_str(&text[cursor..]);
    out
}
