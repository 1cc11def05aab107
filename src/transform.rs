//! Margin transform.
//!
//! Each page's content is scaled horizontally around the center of its
//! content bounding box, which frees an equal strip of margin on both sides.
//! The vertical axis is untouched, so a marker's `y` stays valid after the
//! transform.

use rayon::prelude::*;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Block, Document, Line, Matrix, Page, Rect, Span};
use crate::placement::PlacedAnnotation;

/// Horizontal scale applied to every page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginTransform {
    scale: f32,
}

impl MarginTransform {
    /// Create a transform. The scale must lie in `(0, 1]`.
    pub fn new(scale: f32) -> Result<Self> {
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(Error::InvalidScale(scale));
        }
        Ok(Self { scale })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Union of the page's block boxes, or the full page when it has none.
    pub fn content_bbox(page: &Page) -> Rect {
        Rect::union_all(page.blocks.iter().map(|b| &b.bbox)).unwrap_or_else(|| page.crop_box())
    }

    /// Scale around the horizontal center of `content_bbox`.
    pub fn page_matrix(&self, content_bbox: &Rect) -> Matrix {
        let cx = content_bbox.center_x();
        Matrix::horizontal(self.scale, cx * (1.0 - self.scale))
    }

    /// Transform every page. The input document is left as is.
    pub fn apply(&self, document: &Document, parallel: bool) -> TransformedDocument {
        let pages = if parallel {
            document
                .pages
                .par_iter()
                .enumerate()
                .map(|(i, p)| self.apply_page_at(i, p))
                .collect()
        } else {
            document
                .pages
                .iter()
                .enumerate()
                .map(|(i, p)| self.apply_page_at(i, p))
                .collect()
        };

        TransformedDocument {
            scale: self.scale,
            pages,
        }
    }

    /// Transform one standalone page, keeping its own `number` as index.
    pub fn apply_page(&self, page: &Page) -> TransformedPage {
        self.apply_page_at(page.number, page)
    }

    /// Transform the page at position `index` of its document.
    pub fn apply_page_at(&self, index: usize, page: &Page) -> TransformedPage {
        let content_bbox = Self::content_bbox(page);

        // Nothing to compress: keep the page as it is.
        let (scale, matrix) = if page.blocks.is_empty() {
            (1.0, Matrix::IDENTITY)
        } else {
            (self.scale, self.page_matrix(&content_bbox))
        };

        log::debug!(
            "Page {}: content {:?}, scale {}, shift {:.2}",
            index,
            content_bbox,
            scale,
            matrix.e
        );

        TransformedPage {
            index,
            width: page.width,
            height: page.height,
            scale,
            matrix,
            content_bbox,
            blocks: page
                .blocks
                .iter()
                .map(|b| transform_block(b, &matrix))
                .collect(),
            annotations: Vec::new(),
        }
    }
}

fn transform_block(block: &Block, m: &Matrix) -> Block {
    Block {
        bbox: m.apply_rect(&block.bbox),
        lines: block
            .lines
            .iter()
            .map(|line| Line {
                bbox: m.apply_rect(&line.bbox),
                spans: line
                    .spans
                    .iter()
                    .map(|span| Span {
                        bbox: m.apply_rect(&span.bbox),
                        ..span.clone()
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// A page after the margin transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformedPage {
    /// 0-based page index
    pub index: usize,
    pub width: f32,
    pub height: f32,
    /// Effective scale (1.0 for pages without content)
    pub scale: f32,
    /// Transform from original to transformed page space
    pub matrix: Matrix,
    /// Content bounding box before the transform
    pub content_bbox: Rect,
    /// Content blocks in transformed space
    pub blocks: Vec<Block>,
    /// Annotations committed to this page
    pub annotations: Vec<PlacedAnnotation>,
}

impl TransformedPage {
    /// Horizontal extent of the content after scaling: `(scaled_x0, scaled_x1)`.
    pub fn scaled_bounds(&self) -> (f32, f32) {
        let cx = self.content_bbox.center_x();
        (
            cx + (self.content_bbox.x0 - cx) * self.scale,
            cx + (self.content_bbox.x1 - cx) * self.scale,
        )
    }

    /// Content bounding box after the transform.
    pub fn scaled_content_bbox(&self) -> Rect {
        let (x0, x1) = self.scaled_bounds();
        Rect::new(x0, self.content_bbox.y0, x1, self.content_bbox.y1)
    }

    /// Map a rectangle from original to transformed space.
    pub fn to_transformed(&self, rect: &Rect) -> Rect {
        self.matrix.apply_rect(rect)
    }

    /// Map a rectangle from transformed back to original space.
    pub fn to_original(&self, rect: &Rect) -> Rect {
        match self.matrix.inverse() {
            Some(inv) => inv.apply_rect(rect),
            None => *rect,
        }
    }

    /// Boxes an annotation must not overlap: content blocks and earlier
    /// annotations.
    pub fn obstacles(&self) -> impl Iterator<Item = &Rect> {
        self.blocks
            .iter()
            .map(|b| &b.bbox)
            .chain(self.annotations.iter().map(|a| &a.bbox))
    }

    /// The transformed span tree as a plain page.
    pub fn to_page(&self) -> Page {
        Page {
            number: self.index,
            width: self.width,
            height: self.height,
            blocks: self.blocks.clone(),
        }
    }
}

/// A document after the margin transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformedDocument {
    /// Requested scale
    pub scale: f32,
    pub pages: Vec<TransformedPage>,
}

impl TransformedDocument {
    pub fn page(&self, index: usize) -> Option<&TransformedPage> {
        self.pages.get(index)
    }

    pub fn page_mut(&mut self, index: usize) -> Option<&mut TransformedPage> {
        self.pages.get_mut(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pre-transform content bounding box of a page.
    pub fn content_bbox(&self, index: usize) -> Option<Rect> {
        self.page(index).map(|p| p.content_bbox)
    }

    /// Total number of committed annotations.
    pub fn annotation_count(&self) -> usize {
        self.pages.iter().map(|p| p.annotations.len()).sum()
    }

    /// The transformed pages as a plain document.
    pub fn to_document(&self) -> Document {
        Document {
            pages: self.pages.iter().map(TransformedPage::to_page).collect(),
        }
    }
}
