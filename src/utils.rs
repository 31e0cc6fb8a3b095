//! Utility functions for string truncation and URL handling.
//!
//! - Truncation for logging and for notification payloads (char-boundary safe,
//!   since most text here is Gujarati)
//! - Relative URL resolution for links and image sources

use url::Url;

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}

/// Return at most the first `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Resolve `href` against `base`, returning `None` for unparseable input.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match Url::parse(href) {
        Ok(abs) => Some(abs.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base)
            .and_then(|b| b.join(href))
            .ok()
            .map(|u| u.to_string()),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        // Each Gujarati letter here is 3 bytes; slicing by bytes would panic.
        let s = "કરંટ અફેર ગુજરાતી";
        let result = truncate_for_log(s, 3);
        assert!(result.starts_with("કરં"));
        assert!(result.contains("bytes)"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_resolve_url() {
        let base = "https://www.gktoday.in/current-affairs/";
        assert_eq!(
            resolve_url(base, "/img/a.jpg").as_deref(),
            Some("https://www.gktoday.in/img/a.jpg")
        );
        assert_eq!(
            resolve_url(base, "https://cdn.example.com/x.png").as_deref(),
            Some("https://cdn.example.com/x.png")
        );
        assert_eq!(resolve_url(base, "   "), None);
    }
}
