//! Marker patterns.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// What a marker refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Numbered citation such as `[12]`
    Citation,
    /// Uppercase abbreviation such as `NASA`
    Abbreviation,
}

/// Parsed value of a marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkerValue {
    /// Citation number
    Number(u32),
    /// Literal abbreviation token
    Token(String),
}

impl MarkerValue {
    /// Citation number, if this is one.
    pub fn as_number(&self) -> Option<u32> {
        match self {
            MarkerValue::Number(n) => Some(*n),
            MarkerValue::Token(_) => None,
        }
    }
}

impl std::fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerValue::Number(n) => write!(f, "{}", n),
            MarkerValue::Token(t) => f.write_str(t),
        }
    }
}

/// One match inside a span's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerMatch {
    /// Matched text, including any delimiters
    pub text: String,
    /// Byte offset of the match in the scanned text
    pub start: usize,
    pub value: MarkerValue,
}

/// Finds markers in a piece of text.
pub trait MarkerPattern: Send + Sync {
    /// Kind of marker this pattern finds.
    fn kind(&self) -> MarkerKind;

    /// All matches in `text`, ordered by start offset.
    fn find(&self, text: &str) -> Vec<MarkerMatch>;
}

/// Numbered citations: one or more ASCII digits inside square brackets.
pub struct CitationPattern {
    regex: Regex,
}

impl CitationPattern {
    pub fn new() -> Self {
        Self {
            regex: Regex::new(r"\[([0-9]+)\]").unwrap(),
        }
    }
}

impl Default for CitationPattern {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerPattern for CitationPattern {
    fn kind(&self) -> MarkerKind {
        MarkerKind::Citation
    }

    fn find(&self, text: &str) -> Vec<MarkerMatch> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                // numbers too large for u32 are not citations
                let number = caps.get(1)?.as_str().parse::<u32>().ok()?;
                Some(MarkerMatch {
                    text: whole.as_str().to_string(),
                    start: whole.start(),
                    value: MarkerValue::Number(number),
                })
            })
            .collect()
    }
}

/// Abbreviations: three to five uppercase ASCII letters standing alone.
pub struct AbbreviationPattern {
    regex: Regex,
}

impl AbbreviationPattern {
    pub fn new() -> Self {
        Self {
            regex: Regex::new(r"\b[A-Z]{3,5}\b").unwrap(),
        }
    }
}

impl Default for AbbreviationPattern {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerPattern for AbbreviationPattern {
    fn kind(&self) -> MarkerKind {
        MarkerKind::Abbreviation
    }

    fn find(&self, text: &str) -> Vec<MarkerMatch> {
        self.regex
            .find_iter(text)
            .map(|m| MarkerMatch {
                text: m.as_str().to_string(),
                start: m.start(),
                value: MarkerValue::Token(m.as_str().to_string()),
            })
            .collect()
    }
}
