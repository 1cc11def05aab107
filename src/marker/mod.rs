//! Marker detection.
//!
//! Patterns find markers inside a single span's text; the locator runs them
//! over span indexes and orders the results for reading.

mod locator;
mod pattern;

pub use locator::{MarkerLocator, Occurrence};
pub use pattern::{
    AbbreviationPattern, CitationPattern, MarkerKind, MarkerMatch, MarkerPattern, MarkerValue,
};
