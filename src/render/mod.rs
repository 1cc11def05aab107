//! Output: JSON dumps and annotated PDFs.

mod json;
pub mod pdf;

pub use json::{to_json, JsonFormat};
pub use pdf::write_pdf;
