//! Text normalization shared by the field mapper and the query engine.
//!
//! The search key of a row and an incoming query go through the same
//! [`normalize_text`] so that substring containment is decided on equal terms.

/// Cell values that mean "no value" in exported spreadsheets. Matched exactly
/// (case-sensitive) after trimming.
pub const MISSING_SENTINELS: [&str; 4] = ["nan", "None", "<NA>", "#N/A"];

/// Trims a raw cell and blanks it when it is a missing-value sentinel.
#[must_use]
pub fn clean_cell(raw: &str) -> String {
    let trimmed = raw.trim();
    if MISSING_SENTINELS.contains(&trimmed) {
        String::new()
    } else {
        trimmed.to_owned()
    }
}

/// Lowercases and collapses every whitespace run to a single space, with no
/// leading or trailing whitespace.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalizes a user query before matching.
#[must_use]
pub fn normalize_query(query: &str) -> String {
    normalize_text(query)
}

/// Joins the textual fields of a row into its search key.
#[must_use]
pub fn search_key(parts: &[&str]) -> String {
    normalize_text(&parts.join(" "))
}
