//! Positional document model.
//!
//! A document is a list of pages, each page a list of blocks, each block a
//! list of lines and each line a list of spans. Every node carries a bounding
//! box in page coordinates. The model is independent of the backend that
//! produced it.

mod document;
mod geometry;
mod span;

pub use document::{Document, Page};
pub use geometry::{Matrix, Rect};
pub use span::{Block, Column, Line, Span};
