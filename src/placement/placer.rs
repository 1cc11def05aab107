//! Annotation placement in the freed margins.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::model::{Column, Rect};
use crate::transform::{TransformedDocument, TransformedPage};

use super::layout::{layout_text, TextLine};

/// Where an annotation belongs, in original page space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationLocation {
    /// 0-based page index
    pub page: usize,
    /// Column number; only 1 and 2 can be placed
    pub column: u8,
    /// Bounding box of the marker's span
    pub bbox: Rect,
}

/// Provenance of an annotation's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStyle {
    /// Found in the document itself
    #[default]
    Standard,
    /// Supplied by a fallback source
    LowConfidence,
}

impl AnnotationStyle {
    /// Fill color as RGB in `0..=1`.
    pub fn color(self) -> [f32; 3] {
        match self {
            AnnotationStyle::Standard => [0.5, 0.0, 0.0],
            AnnotationStyle::LowConfidence => [0.0, 0.5, 0.0],
        }
    }
}

/// A request to write one annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRequest {
    pub location: AnnotationLocation,
    pub label: String,
    pub body: String,
    #[serde(default)]
    pub style: AnnotationStyle,
}

impl AnnotationRequest {
    /// Collapsed, NFKC-normalized `"{label}: {body}"`, or `None` for an
    /// empty body.
    pub fn composed_text(&self) -> Option<String> {
        let body = collapse_whitespace(&self.body.nfkc().collect::<String>());
        if body.is_empty() {
            return None;
        }
        Some(format!("{}: {}", collapse_whitespace(&self.label), body))
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// An annotation committed to a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedAnnotation {
    pub label: String,
    /// Full composed text
    pub text: String,
    pub lines: Vec<TextLine>,
    /// Area the text occupies, in transformed space
    pub bbox: Rect,
    pub font_size: f32,
    pub color: [f32; 3],
    pub truncated: bool,
}

/// Why a request was not placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The page does not exist
    UnknownPage { page: usize },
    /// The column is neither 1 nor 2
    UnknownColumn { column: u8 },
    /// The target rectangle has no area or cannot hold one line
    DegenerateTarget,
    /// Nothing to write
    EmptyText,
    /// The text would overlap existing content
    Collision { blocks: Vec<Rect> },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnknownPage { page } => write!(f, "page {} does not exist", page),
            SkipReason::UnknownColumn { column } => write!(f, "unsupported column {}", column),
            SkipReason::DegenerateTarget => f.write_str("no room in the margin"),
            SkipReason::EmptyText => f.write_str("empty annotation text"),
            SkipReason::Collision { blocks } => {
                write!(f, "collides with {} block(s)", blocks.len())
            }
        }
    }
}

/// Result of placing one request.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    Placed(PlacedAnnotation),
    Skipped(SkipReason),
}

impl PlacementOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, PlacementOutcome::Placed(_))
    }
}

/// Target rectangle and the margin it sits in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginTarget {
    pub target: Rect,
    pub margin: Rect,
}

/// Lays annotations out in the margins of transformed pages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationPlacer {
    font_size: f32,
    padding: f32,
}

impl Default for AnnotationPlacer {
    fn default() -> Self {
        Self::new(5.0, 5.0)
    }
}

impl AnnotationPlacer {
    pub fn new(font_size: f32, padding: f32) -> Self {
        Self { font_size, padding }
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Target rectangle for a column at vertical offset `y0`.
    ///
    /// The left column writes between the page edge and the scaled content,
    /// the right column between the scaled content and the page edge.
    pub fn target(
        &self,
        page: &TransformedPage,
        column: u8,
        y0: f32,
    ) -> Result<MarginTarget, SkipReason> {
        let (sx0, sx1) = page.scaled_bounds();
        let pad = self.padding;

        let (target, margin) = match Column::from_number(column) {
            Some(Column::Left) => (
                Rect::new(pad, y0, sx0 - pad, page.height - pad),
                Rect::new(0.0, 0.0, sx0, page.height),
            ),
            Some(Column::Right) => (
                Rect::new(sx1 + pad, y0, page.width - pad, page.height - pad),
                Rect::new(sx1, 0.0, page.width, page.height),
            ),
            None => return Err(SkipReason::UnknownColumn { column }),
        };

        if target.is_degenerate() {
            return Err(SkipReason::DegenerateTarget);
        }
        Ok(MarginTarget { target, margin })
    }

    /// Lay out a request against a page without changing it.
    pub fn plan(&self, page: &TransformedPage, request: &AnnotationRequest) -> PlacementOutcome {
        let MarginTarget { target, margin } =
            match self.target(page, request.location.column, request.location.bbox.y0) {
                Ok(t) => t,
                Err(reason) => return PlacementOutcome::Skipped(reason),
            };

        let Some(text) = request.composed_text() else {
            return PlacementOutcome::Skipped(SkipReason::EmptyText);
        };

        let Some(laid) = layout_text(&text, &target, self.font_size) else {
            return PlacementOutcome::Skipped(SkipReason::DegenerateTarget);
        };

        log::debug!(
            "{} on page {}: target {:?}, text {:?}",
            request.label,
            page.index,
            target,
            laid.bbox
        );

        let blocks = colliding_blocks(&margin, &laid.bbox, page.obstacles());
        if !blocks.is_empty() {
            return PlacementOutcome::Skipped(SkipReason::Collision { blocks });
        }

        PlacementOutcome::Placed(PlacedAnnotation {
            label: request.label.clone(),
            text,
            lines: laid.lines,
            bbox: laid.bbox,
            font_size: laid.font_size,
            color: request.style.color(),
            truncated: laid.truncated,
        })
    }

    /// Lay out a request and commit it to the page when it fits.
    pub fn place(&self, page: &mut TransformedPage, request: &AnnotationRequest) -> PlacementOutcome {
        let outcome = self.plan(page, request);
        match &outcome {
            PlacementOutcome::Placed(annotation) => page.annotations.push(annotation.clone()),
            PlacementOutcome::Skipped(reason) => log::warn!(
                "Skipping {} on page {}: {}",
                request.label,
                page.index,
                reason
            ),
        }
        outcome
    }

    /// Place a request on its page of a transformed document.
    pub fn place_in(
        &self,
        document: &mut TransformedDocument,
        request: &AnnotationRequest,
    ) -> PlacementOutcome {
        match document.page_mut(request.location.page) {
            Some(page) => self.place(page, request),
            None => PlacementOutcome::Skipped(SkipReason::UnknownPage {
                page: request.location.page,
            }),
        }
    }
}

/// Obstacles that lie inside `margin` and overlap `text_bbox`, in a fixed
/// order regardless of input order.
pub fn colliding_blocks<'a, I>(margin: &Rect, text_bbox: &Rect, blocks: I) -> Vec<Rect>
where
    I: IntoIterator<Item = &'a Rect>,
{
    let mut hits: Vec<Rect> = blocks
        .into_iter()
        .filter(|b| margin.contains(b) && b.intersects(text_bbox))
        .copied()
        .collect();
    hits.sort_by(|a, b| {
        a.y0.total_cmp(&b.y0)
            .then(a.x0.total_cmp(&b.x0))
            .then(a.y1.total_cmp(&b.y1))
            .then(a.x1.total_cmp(&b.x1))
    });
    hits
}
