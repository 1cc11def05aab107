//! Span-tree construction from PDFs and layout dumps.

mod backend;
mod json_layout;
mod layout;
mod options;
mod pdf_parser;

pub use backend::{ContentOp, LopdfBackend, PageId, PdfBackend, PdfValue};
pub use json_layout::{parse_layout_json, to_layout_json};
pub use layout::LayoutAnalyzer;
pub use options::{ErrorMode, ParseOptions};
pub use pdf_parser::PdfParser;

pub(crate) use backend::page_box;
