//! Shared text and logging helpers.

use std::fmt::Display;

// =============================================================================
// Text Helpers
// =============================================================================

/// Uppercase the first character, leaving the rest untouched.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// First `max_chars` characters of `s` (char-boundary safe).
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Keep an `Ok` value; log an `Err` at warn level and drop it.
pub fn log_filter_warn<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{}: {}", context, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize_first_keeps_rest() {
        assert_eq!(capitalize_first("fix login bug on mobile Safari"), "Fix login bug on mobile Safari");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    fn test_log_filter_warn() {
        assert_eq!(log_filter_warn::<_, String>(Ok(3), "ctx"), Some(3));
        assert_eq!(log_filter_warn::<u8, _>(Err("bad"), "ctx"), None);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("안녕하세요", 2), "안녕");
        assert_eq!(truncate_chars("short", 40), "short");
    }
}
