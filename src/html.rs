//! Markup cleanup for search API text fields.

use std::sync::LazyLock;

use regex::Regex;

// Non-greedy and single-line: a tag never spans a newline.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.*?>").expect("tag pattern"));

/// Removes every `<...>` tag from `text`.
///
/// `None` and empty input give an empty string. Entities such as `&quot;` are left
/// untouched, which keeps the operation idempotent.
pub fn strip_tags(text: Option<&str>) -> String {
    match text {
        Some(text) if !text.is_empty() => TAG_RE.replace_all(text, "").into_owned(),
        _ => String::new(),
    }
}
