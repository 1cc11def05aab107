//! Input format detection.
//!
//! marginalia accepts either a PDF file or a JSON dump of a span tree
//! produced by an external extractor.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF format information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// Kind of input recognised from its leading bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFormat {
    /// A PDF file
    Pdf(PdfFormat),
    /// A JSON span-tree layout dump
    LayoutJson,
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"
const SNIFF_LEN: usize = 64;

/// Detect the input format of a file.
pub fn detect_input_from_path<P: AsRef<Path>>(path: P) -> Result<InputFormat> {
    let mut file = File::open(path)?;
    let mut header = [0u8; SNIFF_LEN];
    let read = file.read(&mut header)?;
    detect_input_from_bytes(&header[..read])
}

/// Detect the input format from the first bytes of the data.
pub fn detect_input_from_bytes(data: &[u8]) -> Result<InputFormat> {
    if data.starts_with(PDF_MAGIC) {
        return detect_pdf_from_bytes(data).map(InputFormat::Pdf);
    }

    // skip whitespace and a UTF-8 byte order mark
    let first = data
        .iter()
        .copied()
        .find(|b| !(b.is_ascii_whitespace() || matches!(b, 0xEF | 0xBB | 0xBF)));
    match first {
        Some(b'{') | Some(b'[') => Ok(InputFormat::LayoutJson),
        _ => Err(Error::UnknownFormat),
    }
}

/// Validate a PDF header and extract its version.
///
/// # Returns
/// * `Ok(PdfFormat)` if the data starts with a valid PDF header
/// * `Err(Error::UnknownFormat)` if the data is not a PDF
pub fn detect_pdf_from_bytes(data: &[u8]) -> Result<PdfFormat> {
    if data.len() < PDF_MAGIC_LEN + VERSION_LEN || !data.starts_with(PDF_MAGIC) {
        return Err(Error::UnknownFormat);
    }

    let version_bytes = &data[PDF_MAGIC_LEN..PDF_MAGIC_LEN + VERSION_LEN];
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(PdfFormat { version })
}

/// Validate a PDF header read from a file.
pub fn detect_pdf_from_path<P: AsRef<Path>>(path: P) -> Result<PdfFormat> {
    match detect_input_from_path(path)? {
        InputFormat::Pdf(format) => Ok(format),
        InputFormat::LayoutJson => Err(Error::UnknownFormat),
    }
}

fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}

/// Check if bytes start with a valid PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_pdf_from_bytes(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_pdf() {
        let format = detect_input_from_bytes(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3").unwrap();
        assert_eq!(
            format,
            InputFormat::Pdf(PdfFormat {
                version: "1.7".to_string()
            })
        );
    }

    #[test]
    fn test_detect_layout_json() {
        assert_eq!(
            detect_input_from_bytes(b"  \n{\"pages\": []}").unwrap(),
            InputFormat::LayoutJson
        );
        assert_eq!(
            detect_input_from_bytes(b"[{\"width\": 1}]").unwrap(),
            InputFormat::LayoutJson
        );
    }

    #[test]
    fn test_detect_unknown() {
        assert!(matches!(
            detect_input_from_bytes(b"<!DOCTYPE html>"),
            Err(Error::UnknownFormat)
        ));
        assert!(matches!(detect_input_from_bytes(b""), Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_detect_too_short_pdf() {
        assert!(matches!(
            detect_pdf_from_bytes(b"%PDF-"),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_unsupported_version() {
        assert!(matches!(
            detect_pdf_from_bytes(b"%PDF-x.y\n"),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_is_pdf_bytes() {
        assert!(is_pdf_bytes(b"%PDF-1.4\n"));
        assert!(!is_pdf_bytes(b"Not a PDF"));
    }
}
