//! Title → URL-safe identifier derivation.

use regex::Regex;
use std::sync::LazyLock;

static NON_ALPHANUMERIC_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static slug pattern is valid"));

/// Derives the slug used for buckets, files and release notes.
///
/// Lowercases the input, collapses every run of characters outside `a-z0-9`
/// into a single `-` and trims leading and trailing hyphens. The result is
/// always ASCII; non-ASCII letters are dropped, so `"日本"` yields an empty slug.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    NON_ALPHANUMERIC_RUN
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}
