// Canonical names for registry keys.
//
// Every column, attribute and course title that comes out of a Memrise
// payload passes through `sanitize_name` before it is stored or looked up.
// `ColumnName` and `AttributeName` can only be built through that function,
// so a raw label can never reach a registry by accident.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Fallback used when a column label sanitizes to nothing.
pub const DEFAULT_COLUMN_NAME: &str = "Column";
/// Fallback used when an attribute label sanitizes to nothing.
pub const DEFAULT_ATTRIBUTE_NAME: &str = "Attribute";
/// Fallback used when a course title sanitizes to nothing.
pub const DEFAULT_COURSE_TITLE: &str = "Course";

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Clean a display name scraped from the service.
///
/// Strips HTML tags and byte-order marks, normalizes to NFC, collapses runs
/// of whitespace into a single space and trims. Returns `default` when
/// nothing is left. Applying it to its own output changes nothing.
pub fn sanitize_name(name: &str, default: &str) -> String {
    let without_tags = tag_pattern().replace_all(name, "");
    let without_bom: String = without_tags.replace('\u{feff}', "").nfc().collect();
    let collapsed = whitespace_pattern().replace_all(&without_bom, " ");
    let trimmed = collapsed.trim();

    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitized name of a column. Equality and ordering follow the cleaned text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnName(String);

impl ColumnName {
    pub fn new(raw: &str) -> Self {
        Self(sanitize_name(raw, DEFAULT_COLUMN_NAME))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Sanitized name of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeName(String);

impl AttributeName {
    pub fn new(raw: &str) -> Self {
        Self(sanitize_name(raw, DEFAULT_ATTRIBUTE_NAME))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttributeName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
