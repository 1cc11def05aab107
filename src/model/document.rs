//! Page and document types.

use super::{Block, Rect};
use serde::{Deserialize, Serialize};

/// A single page and its span tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page index (0-based)
    #[serde(default)]
    pub number: usize,

    /// Page width in points
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Content blocks in rendering order
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Page {
    /// Create an empty page with the given dimensions.
    pub fn new(number: usize, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            blocks: Vec::new(),
        }
    }

    /// Create an empty US Letter page.
    pub fn letter(number: usize) -> Self {
        Self::new(number, 612.0, 792.0)
    }

    /// Add a block to the page.
    pub fn add_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Full page rectangle.
    pub fn crop_box(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Bounding boxes of every block, text or not.
    pub fn content_blocks(&self) -> Vec<Rect> {
        self.blocks.iter().map(|b| b.bbox).collect()
    }

    /// Plain text of the page, one line per row and a blank row between
    /// blocks.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| b.is_text())
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Whether the page has no blocks at all.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// A paginated document as a span tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Pages in order
    pub pages: Vec<Page>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page by 0-based index.
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    /// Append a page, renumbering it to its position.
    pub fn add_page(&mut self, mut page: Page) {
        page.number = self.pages.len();
        self.pages.push(page);
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Plain text of the whole document.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(Page::text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
