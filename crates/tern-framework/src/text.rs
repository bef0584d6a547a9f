//! Outbound text helpers.

/// Largest char boundary in `s` that is `<= index`.
fn floor_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Splits `text` into parts of at most `max_length` bytes.
///
/// Breaks at the last space or newline inside the limit, dropping the
/// separator; falls back to a hard break when a part has none. A single
/// character longer than the limit is kept whole.
pub fn break_up(text: &str, max_length: usize) -> Vec<String> {
    let max_length = max_length.max(1);
    let mut parts = Vec::new();
    let mut rest = text;

    while rest.len() > max_length {
        let limit = match floor_boundary(rest, max_length) {
            0 => rest.chars().next().map_or(rest.len(), char::len_utf8),
            n => n,
        };
        let (cut, skip) = match rest[..limit].rfind([' ', '\n']) {
            Some(0) | None => (limit, 0),
            Some(at) => (at, 1),
        };
        parts.push(rest[..cut].to_string());
        rest = &rest[cut + skip..];
    }
    if !rest.is_empty() || parts.is_empty() {
        parts.push(rest.to_string());
    }
    parts
}

/// Shortens `text` to at most `max_length` bytes, ending in `...`.
///
/// Prefers cutting at a word boundary.
pub fn truncate(text: &str, max_length: usize) -> String {
    if text.len() <= max_length {
        return text.to_string();
    }
    let limit = floor_boundary(text, max_length.saturating_sub(3));
    let cut = if text[limit..].starts_with([' ', '\n']) {
        limit
    } else {
        match text[..limit].rfind([' ', '\n']) {
            Some(at) if at > 0 => at,
            _ => limit,
        }
    };
    format!("{}...", &text[..cut])
}
