//! Normalization of raw strings read off a page.

/// Trim `value`, cap it at `max_chars` characters, and map empty results to
/// `None`.
///
/// Truncation counts `char`s, so a multi-byte character is never split.
pub fn sanitize(value: Option<&str>, max_chars: Option<usize>) -> Option<String> {
    let trimmed = value?.trim();
    let capped = match max_chars {
        Some(max) => match trimmed.char_indices().nth(max) {
            Some((idx, _)) => trimmed[..idx].trim_end(),
            None => trimmed,
        },
        None => trimmed,
    };
    if capped.is_empty() {
        None
    } else {
        Some(capped.to_string())
    }
}

/// Collapse runs of whitespace (including newlines and NBSP) into single
/// spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
