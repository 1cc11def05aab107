//! Marker resolution.
//!
//! A [`Resolver`] turns an occurrence into the text written next to it. The
//! resolvers here look inside the document itself; anything else (a
//! dictionary, a remote service) plugs in through the same trait or a
//! closure.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::bibliography::find_section_page;
use crate::marker::{MarkerValue, Occurrence};
use crate::model::Document;

/// Text resolved for an occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub text: String,
    /// Set when the text did not come from the document itself
    #[serde(default)]
    pub low_confidence: bool,
}

impl Resolution {
    /// A resolution found in the document.
    pub fn confident(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            low_confidence: false,
        }
    }

    /// A resolution from a fallback source.
    pub fn low_confidence(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            low_confidence: true,
        }
    }
}

/// Resolves markers to annotation text.
///
/// Results need not be deterministic and are not cached by callers.
pub trait Resolver: Send + Sync {
    fn resolve(&self, occurrence: &Occurrence, context: &DocumentContext<'_>) -> Option<Resolution>;
}

impl<F> Resolver for F
where
    F: Fn(&Occurrence, &DocumentContext<'_>) -> Option<Resolution> + Send + Sync,
{
    fn resolve(&self, occurrence: &Occurrence, context: &DocumentContext<'_>) -> Option<Resolution> {
        self(occurrence, context)
    }
}

/// Read-only view of the document shared by resolvers.
///
/// Derived texts are computed on first use and shared between threads.
pub struct DocumentContext<'a> {
    document: &'a Document,
    full_text: OnceLock<String>,
    bibliography: OnceLock<Option<String>>,
    definitions: OnceLock<HashMap<String, String>>,
}

impl<'a> DocumentContext<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            full_text: OnceLock::new(),
            bibliography: OnceLock::new(),
            definitions: OnceLock::new(),
        }
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// Plain text of the whole document.
    pub fn full_text(&self) -> &str {
        self.full_text.get_or_init(|| self.document.plain_text())
    }

    /// Text from the reference section's page to the end of the document.
    pub fn bibliography_text(&self) -> Option<&str> {
        self.bibliography
            .get_or_init(|| {
                let start = find_section_page(self.document)?;
                Some(
                    self.document.pages[start..]
                        .iter()
                        .map(|p| p.text())
                        .collect::<Vec<_>>()
                        .join("\n"),
                )
            })
            .as_deref()
    }

    /// Inline definitions keyed by lowercase word.
    pub fn inline_definitions(&self) -> &HashMap<String, String> {
        self.definitions
            .get_or_init(|| build_inline_definitions(self.full_text()))
    }
}

/// Looks up citation `[n]` in the document's reference list.
///
/// Entries are tried in the forms `[n] ...`, `n. ...` and `n) ...`, each
/// running up to the next entry of the same form. The first non-empty entry
/// wins.
pub struct ReferenceListResolver {
    terminators: [Regex; 3],
}

impl ReferenceListResolver {
    pub fn new() -> Self {
        Self {
            terminators: [
                Regex::new(r"\[[0-9]+\]").unwrap(),
                Regex::new(r"[0-9]+\.").unwrap(),
                Regex::new(r"[0-9]+\)").unwrap(),
            ],
        }
    }

    /// Text of entry `n` in `bibliography`.
    pub fn find_entry(&self, bibliography: &str, n: u32) -> Option<String> {
        let openers = [
            format!(r"\[{}\]\s*", n),
            format!(r"(?:^|[^0-9]){}\.\s*", n),
            format!(r"(?:^|[^0-9]){}\)\s*", n),
        ];

        for (opener, terminator) in openers.iter().zip(&self.terminators) {
            let opener = Regex::new(opener).ok()?;
            for m in opener.find_iter(bibliography) {
                let rest = &bibliography[m.end()..];
                let end = terminator.find(rest).map_or(rest.len(), |t| t.start());
                let entry = rest[..end].trim();
                if !entry.is_empty() {
                    return Some(entry.to_string());
                }
            }
        }
        None
    }
}

impl Default for ReferenceListResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for ReferenceListResolver {
    fn resolve(&self, occurrence: &Occurrence, context: &DocumentContext<'_>) -> Option<Resolution> {
        let n = occurrence.number()?;
        let bibliography = context.bibliography_text()?;
        self.find_entry(bibliography, n).map(Resolution::confident)
    }
}

/// Resolves a token from a definition given in the text itself, such as
/// `NASA (National Aeronautics and Space Administration)` or
/// `Portable Document Format (PDF)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDefinitionResolver;

impl InlineDefinitionResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Resolver for InlineDefinitionResolver {
    fn resolve(&self, occurrence: &Occurrence, context: &DocumentContext<'_>) -> Option<Resolution> {
        let MarkerValue::Token(token) = &occurrence.value else {
            return None;
        };
        context
            .inline_definitions()
            .get(&token.to_lowercase())
            .map(|d| Resolution::confident(d.clone()))
    }
}

/// Collect `word (definition)` pairs, keyed by lowercase word. A later
/// definition of the same word replaces an earlier one.
///
/// When the parenthesized text is itself an uppercase token whose letters
/// are the initials of the preceding words, the token is also defined by
/// those words.
pub fn build_inline_definitions(text: &str) -> HashMap<String, String> {
    let pattern = Regex::new(r"\b([A-Za-z]+)\s*\(([^)]+)\)").unwrap();
    let mut definitions = HashMap::new();

    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(word), Some(definition)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let definition = definition.as_str().trim();
        definitions.insert(word.as_str().to_lowercase(), definition.to_string());

        if let Some(expansion) = expansion_before(&text[..whole.start()], word.as_str(), definition)
        {
            definitions.insert(definition.to_lowercase(), expansion);
        }
    }

    definitions
}

/// Expansion of `token` ending with `last_word`, read backwards from the
/// text preceding the parentheses.
fn expansion_before(preceding: &str, last_word: &str, token: &str) -> Option<String> {
    if !(2..=8).contains(&token.len()) || !token.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }

    let mut words: Vec<&str> = preceding.split_whitespace().collect();
    words.push(last_word);

    let mut initials = Vec::new();
    let mut start = words.len();
    for (i, word) in words.iter().enumerate().rev() {
        let Some(first) = word.chars().next() else {
            continue;
        };
        if first.is_uppercase() {
            initials.push(first);
            start = i;
            if initials.len() == token.len() {
                break;
            }
        } else if !matches!(*word, "and" | "of" | "for" | "the" | "in" | "on") {
            return None;
        }
    }

    initials.reverse();
    let matches = initials.len() == token.len()
        && initials
            .iter()
            .zip(token.chars())
            .all(|(a, b)| a.to_ascii_uppercase() == b);
    matches.then(|| words[start..].join(" "))
}

/// Resolves from a fixed table of definitions, keyed case-insensitively by
/// the marker's value (`"12"`, `"nasa"`).
#[derive(Debug, Clone, Default)]
pub struct DefinitionTable {
    entries: HashMap<String, String>,
}

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, key: impl AsRef<str>, text: impl Into<String>) {
        self.entries.insert(key.as_ref().to_lowercase(), text.into());
    }

    /// Load from a JSON object of `key -> text`.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        let mut table = Self::new();
        for (key, text) in raw {
            table.insert(key, text);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Resolver for DefinitionTable {
    fn resolve(&self, occurrence: &Occurrence, _context: &DocumentContext<'_>) -> Option<Resolution> {
        self.entries
            .get(&occurrence.value.to_string().to_lowercase())
            .map(|t| Resolution::confident(t.clone()))
    }
}

/// Tries each resolver in turn and returns the first hit.
#[derive(Default)]
pub struct ChainResolver {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl ChainResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

impl Resolver for ChainResolver {
    fn resolve(&self, occurrence: &Occurrence, context: &DocumentContext<'_>) -> Option<Resolution> {
        self.resolvers
            .iter()
            .find_map(|r| r.resolve(occurrence, context))
    }
}

/// Uses `primary` and falls back to `fallback`, marking fallback results as
/// low confidence.
pub struct FallbackResolver<P, F> {
    primary: P,
    fallback: F,
}

impl<P: Resolver, F: Resolver> FallbackResolver<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: Resolver, F: Resolver> Resolver for FallbackResolver<P, F> {
    fn resolve(&self, occurrence: &Occurrence, context: &DocumentContext<'_>) -> Option<Resolution> {
        self.primary
            .resolve(occurrence, context)
            .or_else(|| {
                self.fallback.resolve(occurrence, context).map(|r| Resolution {
                    low_confidence: true,
                    ..r
                })
            })
    }
}

/// Resolver over the document itself: reference-list entries for
/// citations and inline definitions for abbreviations.
pub fn in_document() -> ChainResolver {
    ChainResolver::new()
        .with(ReferenceListResolver::new())
        .with(InlineDefinitionResolver::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerKind;
    use crate::model::{Block, Column, Line, Page, Rect, Span};

    fn page_with(lines: &[&str]) -> Page {
        let mut page = Page::letter(0);
        page.add_block(Block::from_lines(
            lines
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    let y = 50.0 + i as f32 * 12.0;
                    Line::from_spans(vec![Span::new(*t, Rect::new(50.0, y, 250.0, y + 10.0))])
                })
                .collect(),
        ));
        page
    }

    fn occurrence(value: MarkerValue) -> Occurrence {
        let kind = match value {
            MarkerValue::Number(_) => MarkerKind::Citation,
            MarkerValue::Token(_) => MarkerKind::Abbreviation,
        };
        Occurrence {
            raw_text: value.to_string(),
            value,
            kind,
            page: 0,
            column: Column::Left,
            block_index: 0,
            line_index: 0,
            bbox: Rect::new(50.0, 50.0, 250.0, 60.0),
        }
    }

    fn paper() -> Document {
        let mut doc = Document::new();
        doc.add_page(page_with(&[
            "The National Aeronautics and Space Administration (NASA) flew it [2].",
        ]));
        doc.add_page(page_with(&[
            "References",
            "[1] A. Author. First paper. 2019.",
            "[2] B. Writer. Second paper,",
            "continued. 2020.",
        ]));
        doc
    }

    #[test]
    fn test_reference_entry_found() {
        let doc = paper();
        let ctx = DocumentContext::new(&doc);
        let found = ReferenceListResolver::new()
            .resolve(&occurrence(MarkerValue::Number(2)), &ctx)
            .unwrap();
        assert_eq!(found.text, "B. Writer. Second paper,\ncontinued. 2020.");
        assert!(!found.low_confidence);
    }

    #[test]
    fn test_reference_entry_numbered_forms() {
        let resolver = ReferenceListResolver::new();
        let text = "References\n1. First entry\n2. Second entry\n11. Eleventh";
        assert_eq!(resolver.find_entry(text, 1).as_deref(), Some("First entry"));
        assert_eq!(resolver.find_entry(text, 11).as_deref(), Some("Eleventh"));
        assert_eq!(
            resolver.find_entry("1) Alpha 2) Beta", 2).as_deref(),
            Some("Beta")
        );
        assert_eq!(resolver.find_entry(text, 7), None);
    }

    #[test]
    fn test_no_reference_section() {
        let mut doc = Document::new();
        doc.add_page(page_with(&["[1] Not a bibliography"]));
        let ctx = DocumentContext::new(&doc);
        assert!(ctx.bibliography_text().is_none());
        assert!(ReferenceListResolver::new()
            .resolve(&occurrence(MarkerValue::Number(1)), &ctx)
            .is_none());
    }

    #[test]
    fn test_inline_definitions() {
        let defs = build_inline_definitions(
            "We use NASA (National Aeronautics and Space Administration) data and \
             the Portable Document Format (PDF). Photosynthesis (the process) matters.",
        );
        assert_eq!(
            defs.get("nasa").map(String::as_str),
            Some("National Aeronautics and Space Administration")
        );
        assert_eq!(defs.get("pdf").map(String::as_str), Some("Portable Document Format"));
        assert_eq!(defs.get("photosynthesis").map(String::as_str), Some("the process"));
    }

    #[test]
    fn test_inline_resolver_matches_reverse_form() {
        let doc = paper();
        let ctx = DocumentContext::new(&doc);
        let found = InlineDefinitionResolver::new()
            .resolve(&occurrence(MarkerValue::Token("NASA".into())), &ctx)
            .unwrap();
        assert_eq!(found.text, "National Aeronautics and Space Administration");
    }

    #[test]
    fn test_fallback_marks_low_confidence() {
        let doc = paper();
        let ctx = DocumentContext::new(&doc);
        let mut table = DefinitionTable::new();
        table.insert("ESA", "European Space Agency");
        table.insert("2", "should not be used");
        let resolver = FallbackResolver::new(in_document(), table);

        let esa = resolver
            .resolve(&occurrence(MarkerValue::Token("ESA".into())), &ctx)
            .unwrap();
        assert!(esa.low_confidence);

        let two = resolver
            .resolve(&occurrence(MarkerValue::Number(2)), &ctx)
            .unwrap();
        assert!(!two.low_confidence);
        assert!(two.text.starts_with("B. Writer"));
    }

    #[test]
    fn test_closure_resolver() {
        let doc = paper();
        let ctx = DocumentContext::new(&doc);
        let resolver = |occ: &Occurrence, _: &DocumentContext<'_>| {
            Some(Resolution::confident(format!("marker {}", occ.raw_text)))
        };
        let found = resolver.resolve(&occurrence(MarkerValue::Number(9)), &ctx).unwrap();
        assert_eq!(found.text, "marker 9");
    }

    #[test]
    fn test_definition_table_from_json() {
        let table = DefinitionTable::from_json(r#"{"NASA": "space agency"}"#).unwrap();
        assert_eq!(table.len(), 1);
        assert!(DefinitionTable::from_json("[1, 2]").is_err());
    }
}
