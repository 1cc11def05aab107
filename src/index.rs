//! Flat, queryable view of a page's spans.
//!
//! The span index flattens the block/line/span tree of one page into a list
//! of entries in rendering order, each carrying the indices of its block and
//! line and the column of its block.

use crate::model::{Column, Document, Page, Span};

/// A span together with its position in the page tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedSpan<'a> {
    /// Index of the containing block, counting non-text blocks
    pub block_index: usize,
    /// Index of the containing line within its block
    pub line_index: usize,
    /// Column of the containing block
    pub column: Column,
    pub span: &'a Span,
}

/// Spans of one page in rendering order.
#[derive(Debug, Clone, Default)]
pub struct SpanIndex<'a> {
    page: usize,
    entries: Vec<IndexedSpan<'a>>,
}

impl<'a> SpanIndex<'a> {
    /// Index a standalone page under its own `number`.
    ///
    /// Blocks without lines are skipped but keep their index position.
    /// Spans with an unusable bounding box are dropped with a warning.
    pub fn build(page: &'a Page) -> Self {
        Self::build_at(page.number, page)
    }

    /// Index a page sitting at position `index` of its document.
    pub fn build_at(index: usize, page: &'a Page) -> Self {
        let mut entries = Vec::new();

        for (block_index, block) in page.blocks.iter().enumerate() {
            if !block.is_text() {
                continue;
            }
            let column = block.column(page.width);

            for (line_index, line) in block.lines.iter().enumerate() {
                for span in &line.spans {
                    if !span.bbox.is_valid() {
                        log::warn!(
                            "Skipping span with invalid bbox on page {} (block {}, line {})",
                            index,
                            block_index,
                            line_index
                        );
                        continue;
                    }
                    entries.push(IndexedSpan {
                        block_index,
                        line_index,
                        column,
                        span,
                    });
                }
            }
        }

        Self {
            page: index,
            entries,
        }
    }

    /// Index every page of a document. Pages are identified by position,
    /// whatever their `number` field says.
    pub fn build_all(document: &'a Document) -> Vec<SpanIndex<'a>> {
        document
            .pages
            .iter()
            .enumerate()
            .map(|(index, page)| SpanIndex::build_at(index, page))
            .collect()
    }

    /// Page index this span index was built from.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedSpan<'a>> {
        self.entries.iter()
    }

    /// Entries belonging to one block.
    pub fn in_block(&self, block_index: usize) -> impl Iterator<Item = &IndexedSpan<'a>> {
        self.entries
            .iter()
            .filter(move |e| e.block_index == block_index)
    }

    /// Entries in one column.
    pub fn in_column(&self, column: Column) -> impl Iterator<Item = &IndexedSpan<'a>> {
        self.entries.iter().filter(move |e| e.column == column)
    }
}

impl<'a, 'b> IntoIterator for &'b SpanIndex<'a> {
    type Item = &'b IndexedSpan<'a>;
    type IntoIter = std::slice::Iter<'b, IndexedSpan<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Line, Rect};

    fn block(x0: f32, y0: f32, lines: &[&[&str]]) -> Block {
        let lines = lines
            .iter()
            .enumerate()
            .map(|(i, spans)| {
                let y = y0 + i as f32 * 12.0;
                Line::from_spans(
                    spans
                        .iter()
                        .enumerate()
                        .map(|(j, text)| {
                            let x = x0 + j as f32 * 40.0;
                            Span::new(*text, Rect::new(x, y, x + 35.0, y + 10.0))
                        })
                        .collect(),
                )
            })
            .collect();
        Block::from_lines(lines)
    }

    fn sample_page() -> Page {
        let mut page = Page::new(0, 600.0, 800.0);
        page.add_block(block(50.0, 100.0, &[&["a", "b"], &["c"]]));
        page.add_block(Block::non_text(Rect::new(50.0, 200.0, 250.0, 300.0)));
        page.add_block(block(320.0, 100.0, &[&["d"]]));
        page
    }

    #[test]
    fn test_index_preserves_rendering_order() {
        let page = sample_page();
        let index = SpanIndex::build(&page);
        let texts: Vec<&str> = index.iter().map(|e| e.span.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_non_text_block_keeps_index_position() {
        let page = sample_page();
        let index = SpanIndex::build(&page);
        let last = index.iter().last().unwrap();
        assert_eq!(last.block_index, 2);
        assert_eq!(last.column, Column::Right);
        assert_eq!(index.in_block(1).count(), 0);
    }

    #[test]
    fn test_line_indices_and_columns() {
        let page = sample_page();
        let index = SpanIndex::build(&page);
        let c = index.iter().find(|e| e.span.text == "c").unwrap();
        assert_eq!((c.block_index, c.line_index), (0, 1));
        assert_eq!(index.in_column(Column::Left).count(), 3);
    }

    #[test]
    fn test_invalid_span_is_skipped() {
        let mut page = Page::new(0, 600.0, 800.0);
        let mut b = block(50.0, 100.0, &[&["ok", "bad"]]);
        b.lines[0].spans[1].bbox = Rect::new(100.0, 100.0, 90.0, 110.0);
        page.add_block(b);

        let index = SpanIndex::build(&page);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_empty_page_gives_empty_index() {
        let page = Page::letter(3);
        let index = SpanIndex::build(&page);
        assert!(index.is_empty());
        assert_eq!(index.page(), 3);
    }

    #[test]
    fn test_build_all_uses_page_position() {
        let doc = Document {
            pages: vec![Page::letter(4), sample_page()],
        };
        let indexes = SpanIndex::build_all(&doc);
        assert_eq!(indexes[0].page(), 0);
        assert_eq!(indexes[1].page(), 1);
        assert_eq!(indexes[1].len(), 4);
    }
}
