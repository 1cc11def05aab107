//! JSON rendering for documents, markers and reports.

use serde::Serialize;

use crate::error::{Error, Result};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize any model value (document, occurrences, report) to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, Page};

    #[test]
    fn test_to_json_pretty() {
        let mut doc = Document::new();
        doc.add_page(Page::letter(0));

        let json = to_json(&doc, JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"width\""));
        assert!(json.contains('\n')); // Pretty has newlines
    }

    #[test]
    fn test_to_json_compact() {
        let mut doc = Document::new();
        doc.add_page(Page::letter(0));

        let json = to_json(&doc, JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n')); // Compact has no newlines
    }

    #[test]
    fn test_to_json_slice() {
        let pages = vec![Page::letter(0), Page::letter(1)];
        let json = to_json(pages.as_slice(), JsonFormat::Compact).unwrap();
        assert!(json.starts_with('['));
    }
}
