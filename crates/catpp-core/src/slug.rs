/// Chapter slug and route derivation.
///
/// The site links to `/{category}/{slug}` and the generator writes the page
/// file at `{category}/{slug}`, so both sides must call the same function.
use std::sync::LazyLock;

use regex::Regex;

/// Characters outside ASCII word characters, whitespace and `-`.
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").expect("valid regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Format a chapter title into its URL slug.
///
/// Lowercases (ASCII), deletes every character that is not a word character,
/// whitespace or hyphen, then collapses whitespace runs into one hyphen.
/// Leading and trailing hyphens are not trimmed: `" C++ "` becomes `"-c-"`.
pub fn format_chapter_path(title: &str) -> String {
    let lowered = title.to_ascii_lowercase();
    let stripped = DISALLOWED.replace_all(&lowered, "");
    WHITESPACE_RUN.replace_all(&stripped, "-").into_owned()
}

/// Site route of a chapter: `/{category}/{format_chapter_path(title)}`.
pub fn chapter_route(category: &str, chapter_title: &str) -> String {
    format!("/{category}/{}", format_chapter_path(chapter_title))
}
