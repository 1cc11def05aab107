//! Annotation options.

use serde::{Deserialize, Serialize};

use crate::bibliography::{BibliographyFilter, SectionBoundaryFilter, SequenceRunFilter};
use crate::marker::{AbbreviationPattern, CitationPattern, MarkerLocator};

/// Which markers to annotate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerSelection {
    /// `[n]` citations
    #[default]
    Citations,
    /// Uppercase abbreviations
    Abbreviations,
    /// Both kinds
    Both,
}

impl MarkerSelection {
    /// Locator for this selection.
    pub fn locator(self) -> MarkerLocator {
        match self {
            MarkerSelection::Citations => MarkerLocator::citations(),
            MarkerSelection::Abbreviations => MarkerLocator::abbreviations(),
            MarkerSelection::Both => MarkerLocator::new()
                .with_pattern(CitationPattern::new())
                .with_pattern(AbbreviationPattern::new()),
        }
    }
}

/// How the reference list's own citations are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BibliographyStrategy {
    /// Trailing `1, 2, 3, ...` run of citation numbers
    #[default]
    SequenceRun,
    /// Everything from the last "References"/"Bibliography" page on
    SectionBoundary,
}

impl BibliographyStrategy {
    /// Filter implementing this strategy.
    pub fn filter(self) -> Box<dyn BibliographyFilter> {
        match self {
            BibliographyStrategy::SequenceRun => Box::new(SequenceRunFilter::new()),
            BibliographyStrategy::SectionBoundary => Box::new(SectionBoundaryFilter::new()),
        }
    }
}

/// Options for annotating a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotateOptions {
    /// Horizontal scale applied to page content, in `(0, 1]`
    pub scale: f32,

    /// Annotation font size in points
    pub font_size: f32,

    /// Gap between annotations and the page edge or content
    pub padding: f32,

    /// Markers to annotate
    pub markers: MarkerSelection,

    /// Reference-list detection
    pub bibliography: BibliographyStrategy,

    /// Whether to resolve markers and lay out pages in parallel
    pub parallel: bool,
}

impl AnnotateOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content scale.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Set the annotation font size.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    /// Set the padding.
    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }

    /// Set which markers to annotate.
    pub fn with_markers(mut self, markers: MarkerSelection) -> Self {
        self.markers = markers;
        self
    }

    /// Set the reference-list detection strategy.
    pub fn with_bibliography(mut self, strategy: BibliographyStrategy) -> Self {
        self.bibliography = strategy;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            scale: 0.9,
            font_size: 5.0,
            padding: 5.0,
            markers: MarkerSelection::Citations,
            bibliography: BibliographyStrategy::SequenceRun,
            parallel: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AnnotateOptions::default();
        assert_eq!(options.scale, 0.9);
        assert_eq!(options.font_size, 5.0);
        assert_eq!(options.padding, 5.0);
        assert_eq!(options.markers, MarkerSelection::Citations);
        assert_eq!(options.bibliography, BibliographyStrategy::SequenceRun);
        assert!(options.parallel);
    }

    #[test]
    fn test_builder() {
        let options = AnnotateOptions::new()
            .with_scale(0.8)
            .with_markers(MarkerSelection::Both)
            .with_bibliography(BibliographyStrategy::SectionBoundary)
            .sequential();
        assert_eq!(options.scale, 0.8);
        assert_eq!(options.markers, MarkerSelection::Both);
        assert!(!options.parallel);
    }

    #[test]
    fn test_selection_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&BibliographyStrategy::SectionBoundary).unwrap(),
            "\"section_boundary\""
        );
    }
}
