use std::sync::OnceLock;

use regex::Regex;

static ANSI_REGEX: OnceLock<Regex> = OnceLock::new();

/// Removes terminal escape sequences (colors, cursor movement).
pub fn strip_ansi(text: &str) -> String {
    let re = ANSI_REGEX.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b[^\[]?").expect("ANSI_REGEX is valid")
    });
    re.replace_all(text, "").into_owned()
}

/// Truncates to at most `max` chars, appending `…` when cut.
pub fn preview(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((end, _)) => {
            let mut out = s[..end].to_string();
            out.push('…');
            out
        }
    }
}

/// Truncates to at most `max` chars without a marker.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        None => s,
        Some((end, _)) => &s[..end],
    }
}
