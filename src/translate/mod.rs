//! Closed-dictionary translation: exact entries, ordered pattern rules and a
//! longest-first partial-substring fallback. Everything here is pure; a miss
//! returns the input unchanged.

use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod pattern;

pub use catalog::{Catalog, CatalogError};
pub use pattern::{CompiledRule, RuleError};

/// Exact full-string pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub source: String,
    pub target: String,
}

impl DictionaryEntry {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Regex with capture groups plus a `$1` / `${name}` replacement template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub pattern: String,
    pub replacement: String,
}

impl PatternRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// True for Cyrillic code points (base block, supplement, extended A/B/C).
#[inline]
pub fn is_source_char(c: char) -> bool {
    matches!(c,
        '\u{0400}'..='\u{052F}'
        | '\u{1C80}'..='\u{1C8F}'
        | '\u{2DE0}'..='\u{2DFF}'
        | '\u{A640}'..='\u{A69F}')
}

/// Whether `text` contains at least one source-script character.
/// Text without one is never translated.
#[inline]
pub fn has_source_script(text: &str) -> bool {
    text.chars().any(is_source_char)
}

/// Splits `text` into (leading whitespace, core, trailing whitespace).
pub(crate) fn split_padding(text: &str) -> (&str, &str, &str) {
    let start = text.len() - text.trim_start().len();
    let end = text.trim_end().len();
    if start >= end {
        return (text, "", "");
    }
    (&text[..start], &text[start..end], &text[end..])
}
