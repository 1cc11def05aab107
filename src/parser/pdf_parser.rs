//! PDF document parser using lopdf.

use std::io::Read;
use std::path::Path;

use lopdf::Document as LopdfDocument;
use rayon::prelude::*;

use crate::detect::detect_pdf_from_path;
use crate::error::{Error, Result};
use crate::model::{Document, Page};

use super::backend::{LopdfBackend, PageId, PdfBackend};
use super::layout::LayoutAnalyzer;
use super::options::{ErrorMode, ParseOptions};

/// PDF document parser producing span trees.
pub struct PdfParser {
    backend: LopdfBackend,
    options: ParseOptions,
}

impl PdfParser {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();

        // Verify it's a PDF
        detect_pdf_from_path(path)?;

        let doc = LopdfDocument::load(path)?;
        Ok(Self::from_document(doc, options))
    }

    /// Parse a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Parse a PDF from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self::from_document(doc, options))
    }

    /// Parse a PDF from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, ParseOptions::default())
    }

    /// Parse a PDF from a reader with custom options.
    pub fn from_reader_with_options<R: Read>(mut reader: R, options: ParseOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_options(&data, options)
    }

    /// Wrap an already loaded document.
    pub fn from_document(doc: LopdfDocument, options: ParseOptions) -> Self {
        // lopdf decrypts documents with an empty user password on load;
        // anything else stays unreadable.
        if options.password.is_some() && doc.is_encrypted() {
            log::warn!("Password was provided but lopdf cannot decrypt this document");
        }

        Self {
            backend: LopdfBackend::from_document(doc),
            options,
        }
    }

    /// PDF version of the loaded document.
    pub fn version(&self) -> String {
        self.backend.version()
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.backend.pages().len()
    }

    /// The loaded document, for rewriting after annotation.
    pub fn raw_doc(&self) -> &LopdfDocument {
        self.backend.raw_doc()
    }

    /// Consume the parser and return the loaded document.
    pub fn into_inner(self) -> LopdfDocument {
        self.backend.into_inner()
    }

    /// Build the span tree of every page.
    pub fn parse(&self) -> Result<Document> {
        if self.backend.is_encrypted() {
            log::warn!("Document is encrypted; text may not decode");
        }

        let page_ids: Vec<(u32, PageId)> = self.backend.pages().into_iter().collect();

        let pages: Vec<Page> = if self.options.parallel && page_ids.len() > 1 {
            page_ids
                .par_iter()
                .enumerate()
                .map(|(index, (number, id))| self.parse_page(index, *number, *id))
                .collect::<Result<_>>()?
        } else {
            page_ids
                .iter()
                .enumerate()
                .map(|(index, (number, id))| self.parse_page(index, *number, *id))
                .collect::<Result<_>>()?
        };

        let mut document = Document::new();
        for page in pages {
            document.add_page(page);
        }

        log::debug!("Parsed {} pages", document.page_count());
        Ok(document)
    }

    /// Build the span tree of one page by 0-based index.
    pub fn parse_page_at(&self, index: usize) -> Result<Page> {
        let pages = self.backend.pages();
        let count = pages.len();
        let (number, id) = pages
            .into_iter()
            .nth(index)
            .ok_or(Error::PageOutOfRange(index, count))?;
        self.parse_page(index, number, id)
    }

    /// Parse a single page.
    fn parse_page(&self, index: usize, page_num: u32, page_id: PageId) -> Result<Page> {
        let page_box = self.backend.page_box(page_id);
        let mut page = Page::new(index, page_box.width(), page_box.height());

        match LayoutAnalyzer::new(&self.backend).extract_page_blocks(page_id) {
            Ok(blocks) => page.blocks = blocks,
            Err(e) => {
                if self.options.error_mode == ErrorMode::Strict {
                    return Err(e);
                }
                // In lenient mode, keep the page but drop its content
                log::warn!("Failed to analyze page {}: {}", page_num, e);
            }
        }

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    fn sample_pdf() -> Vec<u8> {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("As shown in [1].")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_parse_inherits_media_box() {
        let parser = PdfParser::from_bytes(&sample_pdf()).unwrap();
        let doc = parser.parse().unwrap();

        assert_eq!(doc.page_count(), 1);
        let page = &doc.pages[0];
        assert_eq!(page.width, 612.0);
        assert_eq!(page.height, 792.0);
        assert!(page.text().contains("[1]"));
    }

    #[test]
    fn test_parse_sequential_matches_parallel() {
        let bytes = sample_pdf();
        let parallel = PdfParser::from_bytes(&bytes).unwrap().parse().unwrap();
        let sequential =
            PdfParser::from_bytes_with_options(&bytes, ParseOptions::new().sequential())
                .unwrap()
                .parse()
                .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_parse_page_at() {
        let parser = PdfParser::from_bytes(&sample_pdf()).unwrap();
        let page = parser.parse_page_at(0).unwrap();
        assert!(page.text().contains("As shown"));
        assert!(matches!(
            parser.parse_page_at(3),
            Err(Error::PageOutOfRange(3, 1))
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(PdfParser::from_bytes(b"not a pdf at all").is_err());
    }
}
