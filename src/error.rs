//! Error types for marginalia.
//!
//! Only document-level failures surface as [`Error`]. Problems with a single
//! page, marker or annotation are reported as values by the stage that
//! encountered them and never abort the pipeline.

use std::io;
use thiserror::Error;

/// Result type alias for marginalia operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while annotating a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is neither a PDF nor a span-tree layout dump.
    #[error("Unknown input format: expected a PDF or a JSON layout dump")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// A span-tree layout dump could not be decoded.
    #[error("Layout error: {0}")]
    Layout(String),

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// The margin scale factor is outside `(0, 1]`.
    #[error("Invalid scale factor {0}: must be in (0, 1]")]
    InvalidScale(f32),

    /// Error while writing the annotated output.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Layout(err.to_string())
    }
}
