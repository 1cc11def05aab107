//! Span-tree layout dumps.
//!
//! Accepts the JSON an external extractor produces for a document: either
//! `{"pages": [...]}` or a bare array of pages, each page carrying `width`,
//! `height` and a list of `blocks` with `bbox`, `lines` and `spans`.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{Document, Page};

use super::options::{ErrorMode, ParseOptions};

/// Parse a layout dump into a document.
///
/// In strict mode any malformed page fails the whole parse. In lenient mode a
/// malformed page keeps its dimensions when they can be read and loses its
/// blocks.
pub fn parse_layout_json(json: &str, options: &ParseOptions) -> Result<Document> {
    let root: Value = serde_json::from_str(json)?;

    let pages = match root {
        Value::Array(pages) => pages,
        Value::Object(mut map) => match map.remove("pages") {
            Some(Value::Array(pages)) => pages,
            _ => return Err(Error::Layout("missing \"pages\" array".to_string())),
        },
        _ => {
            return Err(Error::Layout(
                "expected an object or an array of pages".to_string(),
            ))
        }
    };

    let mut document = Document::new();
    for (index, value) in pages.into_iter().enumerate() {
        let page = match serde_json::from_value::<Page>(value.clone()) {
            Ok(page) => page,
            Err(e) if options.error_mode == ErrorMode::Lenient => {
                log::warn!("Malformed layout for page {}: {}", index, e);
                salvage_page(&value, index)
            }
            Err(e) => return Err(Error::Layout(format!("page {}: {}", index, e))),
        };
        document.add_page(page);
    }

    Ok(document)
}

/// Serialize a document as a layout dump that [`parse_layout_json`] accepts.
pub fn to_layout_json(document: &Document) -> Result<String> {
    Ok(serde_json::to_string(document)?)
}

/// Keep what can be read of a malformed page.
fn salvage_page(value: &Value, index: usize) -> Page {
    let dimension = |key: &str| value.get(key).and_then(Value::as_f64).map(|v| v as f32);
    match (dimension("width"), dimension("height")) {
        (Some(width), Some(height)) => Page::new(index, width, height),
        _ => Page::letter(index),
    }
}
