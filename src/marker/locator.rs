//! Marker occurrences in reading order.

use serde::{Deserialize, Serialize};

use crate::index::SpanIndex;
use crate::model::{Column, Document, Rect};

use super::pattern::{
    AbbreviationPattern, CitationPattern, MarkerKind, MarkerMatch, MarkerPattern, MarkerValue,
};

/// A located marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Matched text as it appears on the page
    pub raw_text: String,
    pub value: MarkerValue,
    pub kind: MarkerKind,
    /// 0-based page index
    pub page: usize,
    pub column: Column,
    pub block_index: usize,
    pub line_index: usize,
    /// Bounding box of the containing span
    pub bbox: Rect,
}

impl Occurrence {
    /// Reading-order key. Within a page the whole left column precedes the
    /// right column.
    pub fn reading_order_key(&self) -> (usize, Column, usize, usize) {
        (self.page, self.column, self.block_index, self.line_index)
    }

    /// Citation number, if this is a citation.
    pub fn number(&self) -> Option<u32> {
        self.value.as_number()
    }
}

/// Scans span indexes with a set of marker patterns.
pub struct MarkerLocator {
    patterns: Vec<Box<dyn MarkerPattern>>,
}

impl MarkerLocator {
    /// A locator with no patterns.
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Locator for `[n]` citations.
    pub fn citations() -> Self {
        Self::new().with_pattern(CitationPattern::new())
    }

    /// Locator for uppercase abbreviations.
    pub fn abbreviations() -> Self {
        Self::new().with_pattern(AbbreviationPattern::new())
    }

    /// Add a pattern.
    pub fn with_pattern(mut self, pattern: impl MarkerPattern + 'static) -> Self {
        self.patterns.push(Box::new(pattern));
        self
    }

    /// Locate markers across span indexes, sorted in reading order.
    ///
    /// Markers split across two spans are not found: every span is scanned
    /// on its own.
    pub fn locate(&self, indexes: &[SpanIndex<'_>]) -> Vec<Occurrence> {
        let mut occurrences = Vec::new();

        for index in indexes {
            for entry in index {
                let mut matches: Vec<(MarkerKind, MarkerMatch)> = self
                    .patterns
                    .iter()
                    .flat_map(|p| {
                        let kind = p.kind();
                        p.find(&entry.span.text).into_iter().map(move |m| (kind, m))
                    })
                    .collect();
                matches.sort_by_key(|(_, m)| m.start);

                occurrences.extend(matches.into_iter().map(|(kind, m)| Occurrence {
                    raw_text: m.text,
                    value: m.value,
                    kind,
                    page: index.page(),
                    column: entry.column,
                    block_index: entry.block_index,
                    line_index: entry.line_index,
                    bbox: entry.span.bbox,
                }));
            }
        }

        // stable: ties keep rendering and left-to-right order
        occurrences.sort_by_key(Occurrence::reading_order_key);
        occurrences
    }

    /// Index and scan a whole document.
    pub fn locate_document(&self, document: &Document) -> Vec<Occurrence> {
        self.locate(&SpanIndex::build_all(document))
    }
}

impl Default for MarkerLocator {
    fn default() -> Self {
        Self::citations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Line, Page, Span};

    fn text_block(x0: f32, y0: f32, lines: &[&str]) -> Block {
        Block::from_lines(
            lines
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    let y = y0 + i as f32 * 12.0;
                    Line::from_spans(vec![Span::new(*text, Rect::new(x0, y, x0 + 200.0, y + 10.0))])
                })
                .collect(),
        )
    }

    #[test]
    fn test_left_column_precedes_right_column() {
        let mut page = Page::new(0, 600.0, 800.0);
        // right column block rendered first
        page.add_block(text_block(320.0, 100.0, &["right [2]"]));
        page.add_block(text_block(50.0, 500.0, &["left [1]"]));
        let mut doc = Document::new();
        doc.add_page(page);

        let occurrences = MarkerLocator::citations().locate_document(&doc);
        let numbers: Vec<u32> = occurrences.iter().filter_map(Occurrence::number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(occurrences[0].column, Column::Left);
    }

    #[test]
    fn test_matches_in_one_span_keep_offset_order() {
        let mut page = Page::new(0, 600.0, 800.0);
        page.add_block(text_block(50.0, 100.0, &["[5] then [2] then [9]"]));
        let mut doc = Document::new();
        doc.add_page(page);

        let numbers: Vec<u32> = MarkerLocator::citations()
            .locate_document(&doc)
            .iter()
            .filter_map(Occurrence::number)
            .collect();
        assert_eq!(numbers, vec![5, 2, 9]);
    }

    #[test]
    fn test_both_patterns_interleave_by_offset() {
        let mut page = Page::new(0, 600.0, 800.0);
        page.add_block(text_block(50.0, 100.0, &["[1] NASA and [2] ESA"]));
        let mut doc = Document::new();
        doc.add_page(page);

        let locator = MarkerLocator::citations().with_pattern(AbbreviationPattern::new());
        let raw: Vec<String> = locator
            .locate_document(&doc)
            .into_iter()
            .map(|o| o.raw_text)
            .collect();
        assert_eq!(raw, vec!["[1]", "NASA", "[2]", "ESA"]);
    }

    #[test]
    fn test_occurrence_carries_span_position() {
        let mut page = Page::new(0, 600.0, 800.0);
        page.add_block(Block::non_text(Rect::new(0.0, 0.0, 10.0, 10.0)));
        page.add_block(text_block(50.0, 100.0, &["intro", "see [3]"]));
        let mut doc = Document::new();
        doc.add_page(Page::letter(0));
        doc.add_page(page);

        let occurrences = MarkerLocator::citations().locate_document(&doc);
        assert_eq!(occurrences.len(), 1);
        let occ = &occurrences[0];
        assert_eq!((occ.page, occ.block_index, occ.line_index), (1, 1, 1));
        assert_eq!(occ.bbox, Rect::new(50.0, 112.0, 250.0, 122.0));
        assert_eq!(occ.kind, MarkerKind::Citation);
    }

    #[test]
    fn test_empty_document_has_no_occurrences() {
        let mut doc = Document::new();
        doc.add_page(Page::letter(0));
        assert!(MarkerLocator::citations().locate_document(&doc).is_empty());
    }
}
