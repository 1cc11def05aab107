//! Block, line and span types of the span tree.

use super::Rect;
use serde::{Deserialize, Serialize};

/// The smallest unit of positioned text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Text content
    pub text: String,

    /// Bounding box in page coordinates
    pub bbox: Rect,

    /// Font size in points (0 when unknown)
    #[serde(default)]
    pub size: f32,

    /// Font name as reported by the backend
    #[serde(default)]
    pub font: String,
}

impl Span {
    /// Create a span with unknown font information.
    pub fn new(text: impl Into<String>, bbox: Rect) -> Self {
        Self {
            text: text.into(),
            bbox,
            size: 0.0,
            font: String::new(),
        }
    }

    /// Set font name and size.
    pub fn with_font(mut self, font: impl Into<String>, size: f32) -> Self {
        self.font = font.into();
        self.size = size;
        self
    }
}

/// A line of spans sharing a baseline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Line {
    /// Bounding box of the line
    #[serde(default)]
    pub bbox: Rect,

    /// Spans in rendering order
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl Line {
    /// Build a line whose bbox encloses its spans.
    pub fn from_spans(spans: Vec<Span>) -> Self {
        let bbox = Rect::union_all(spans.iter().map(|s| &s.bbox)).unwrap_or_default();
        Self { bbox, spans }
    }

    /// Concatenated span text.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// A content block. Blocks without lines are non-text content such as
/// images; they still occupy space on the page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    /// Bounding box of the block
    pub bbox: Rect,

    /// Lines in rendering order (empty for non-text blocks)
    #[serde(default)]
    pub lines: Vec<Line>,
}

impl Block {
    /// Build a text block whose bbox encloses its lines.
    pub fn from_lines(lines: Vec<Line>) -> Self {
        let bbox = Rect::union_all(lines.iter().map(|l| &l.bbox)).unwrap_or_default();
        Self { bbox, lines }
    }

    /// A non-text block (image placeholder, figure).
    pub fn non_text(bbox: Rect) -> Self {
        Self {
            bbox,
            lines: Vec::new(),
        }
    }

    /// Whether the block carries text.
    pub fn is_text(&self) -> bool {
        !self.lines.is_empty()
    }

    /// Column of the block on a page of the given width.
    pub fn column(&self, page_width: f32) -> Column {
        Column::of(&self.bbox, page_width)
    }

    /// Block text with one line per row.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Column of a block on a two-column page.
///
/// Derived from geometry on demand and never stored on the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Column {
    /// Horizontal center left of the page midline
    Left,
    /// Horizontal center at or right of the page midline
    Right,
}

impl Column {
    /// Column of a bounding box on a page of the given width.
    pub fn of(bbox: &Rect, page_width: f32) -> Self {
        let center = (bbox.x0 + bbox.x1) / 2.0;
        if center < page_width / 2.0 {
            Column::Left
        } else {
            Column::Right
        }
    }

    /// 1-based column number.
    pub fn number(self) -> u8 {
        match self {
            Column::Left => 1,
            Column::Right => 2,
        }
    }

    /// Column for a 1-based number; anything but 1 or 2 is `None`.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Column::Left),
            2 => Some(Column::Right),
            _ => None,
        }
    }
}

impl From<Column> for u8 {
    fn from(c: Column) -> Self {
        c.number()
    }
}

impl TryFrom<u8> for Column {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Column::from_number(n).ok_or_else(|| format!("invalid column number {}", n))
    }
}
