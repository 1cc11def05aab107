//! # marginalia
//!
//! Margin annotation for multi-column documents.
//!
//! marginalia finds short markers in a paginated document (citation brackets
//! such as `[12]` and uppercase abbreviations such as `NASA`), compresses each
//! page's content horizontally to free equal margins, and writes the text a
//! marker refers to into the margin next to it without overlapping anything
//! already there.
//!
//! ## Quick Start
//!
//! ```no_run
//! use marginalia::{annotate_file, AnnotateOptions};
//!
//! fn main() -> marginalia::Result<()> {
//!     let report = annotate_file("paper.pdf", "paper.annotated.pdf", AnnotateOptions::default())?;
//!     println!("{} placed, {} skipped", report.placed, report.skipped);
//!     Ok(())
//! }
//! ```
//!
//! ## Stages
//!
//! - **Span index**: a flat view of every page's spans with block, line and
//!   column positions ([`index`])
//! - **Marker locator**: pattern matching over the index, in reading order
//!   ([`marker`])
//! - **Bibliography filter**: drops the reference list's own citations
//!   ([`bibliography`])
//! - **Margin transform**: per-page horizontal scale around the content
//!   ([`transform`])
//! - **Annotation placer**: wrapped text in the margin with collision checks
//!   ([`placement`])
//!
//! Resolution of a marker's text is pluggable through [`Resolver`].

pub mod bibliography;
pub mod detect;
pub mod error;
pub mod index;
pub mod marker;
pub mod model;
pub mod options;
pub mod parser;
pub mod pipeline;
pub mod placement;
pub mod render;
pub mod resolve;
pub mod transform;

// Re-export commonly used types
pub use bibliography::{BibliographyFilter, SectionBoundaryFilter, SequenceRunFilter};
pub use detect::{detect_input_from_bytes, detect_input_from_path, InputFormat, PdfFormat};
pub use error::{Error, Result};
pub use index::{IndexedSpan, SpanIndex};
pub use marker::{MarkerKind, MarkerLocator, MarkerPattern, MarkerValue, Occurrence};
pub use model::{Block, Column, Document, Line, Matrix, Page, Rect, Span};
pub use options::{AnnotateOptions, BibliographyStrategy, MarkerSelection};
pub use parser::{parse_layout_json, ErrorMode, ParseOptions, PdfParser};
pub use pipeline::{Annotated, AnnotationReport, Annotator, EntryStatus, ReportEntry};
pub use placement::{
    AnnotationLocation, AnnotationPlacer, AnnotationRequest, AnnotationStyle, PlacementOutcome,
    SkipReason,
};
pub use render::JsonFormat;
pub use resolve::{DocumentContext, FallbackResolver, Resolution, Resolver};
pub use transform::{MarginTransform, TransformedDocument, TransformedPage};

use std::io::Read;
use std::path::Path;

use lopdf::Document as LopdfDocument;

/// Parse a PDF file into a span tree.
///
/// # Example
///
/// ```no_run
/// use marginalia::parse_file;
///
/// let doc = parse_file("paper.pdf").unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let parser = PdfParser::open(path)?;
    parser.parse()
}

/// Parse a PDF file with custom options.
pub fn parse_file_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Document> {
    let parser = PdfParser::open_with_options(path, options)?;
    parser.parse()
}

/// Parse a PDF from bytes.
pub fn parse_bytes(data: &[u8]) -> Result<Document> {
    let parser = PdfParser::from_bytes(data)?;
    parser.parse()
}

/// Parse a PDF from a reader.
pub fn parse_reader<R: Read>(reader: R) -> Result<Document> {
    let parser = PdfParser::from_reader(reader)?;
    parser.parse()
}

/// Read a span-tree layout dump from a file.
pub fn load_layout<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Document> {
    let json = std::fs::read_to_string(path)?;
    parse_layout_json(&json, options)
}

/// Located markers of a document after removing the reference list.
///
/// # Example
///
/// ```no_run
/// use marginalia::{locate_markers, parse_file, AnnotateOptions};
///
/// let doc = parse_file("paper.pdf").unwrap();
/// for occ in locate_markers(&doc, &AnnotateOptions::default()) {
///     println!("{} on page {}", occ.raw_text, occ.page);
/// }
/// ```
pub fn locate_markers(document: &Document, options: &AnnotateOptions) -> Vec<Occurrence> {
    Annotator::new(options.clone()).markers(document).1
}

/// Annotate a PDF with its own reference list and inline definitions and
/// save the result.
pub fn annotate_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: AnnotateOptions,
) -> Result<AnnotationReport> {
    let session = Marginalia::new().with_options(options).open(input)?;
    let annotated = session.annotate(&resolve::in_document())?;
    session.save(&annotated, output)?;
    Ok(annotated.report)
}

/// Builder for opening and annotating documents.
///
/// # Example
///
/// ```no_run
/// use marginalia::{Marginalia, MarkerSelection};
/// use marginalia::resolve::in_document;
///
/// let session = Marginalia::new()
///     .with_scale(0.85)
///     .with_markers(MarkerSelection::Both)
///     .open("paper.pdf")?;
/// let annotated = session.annotate(&in_document())?;
/// session.save(&annotated, "paper.annotated.pdf")?;
/// # Ok::<(), marginalia::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Marginalia {
    parse_options: ParseOptions,
    annotate_options: AnnotateOptions,
}

impl Marginalia {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all annotation options.
    pub fn with_options(mut self, options: AnnotateOptions) -> Self {
        self.annotate_options = options;
        self
    }

    /// Set the content scale.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.annotate_options = self.annotate_options.with_scale(scale);
        self
    }

    /// Set which markers to annotate.
    pub fn with_markers(mut self, markers: MarkerSelection) -> Self {
        self.annotate_options = self.annotate_options.with_markers(markers);
        self
    }

    /// Set the reference-list detection strategy.
    pub fn with_bibliography(mut self, strategy: BibliographyStrategy) -> Self {
        self.annotate_options = self.annotate_options.with_bibliography(strategy);
        self
    }

    /// Enable lenient parsing mode (the default).
    pub fn lenient(mut self) -> Self {
        self.parse_options = self.parse_options.lenient();
        self
    }

    /// Fail the whole document when any page cannot be decoded.
    pub fn strict(mut self) -> Self {
        self.parse_options = self.parse_options.strict();
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parse_options = self.parse_options.sequential();
        self.annotate_options = self.annotate_options.sequential();
        self
    }

    /// Set document password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.parse_options = self.parse_options.with_password(password);
        self
    }

    /// Open a PDF or a layout dump, detected from its contents.
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<Session> {
        let path = path.as_ref();
        match detect_input_from_path(path)? {
            InputFormat::Pdf(_) => {
                let parser = PdfParser::open_with_options(path, self.parse_options.clone())?;
                let document = parser.parse()?;
                Ok(self.session(document, Some(parser.into_inner())))
            }
            InputFormat::LayoutJson => {
                let document = load_layout(path, &self.parse_options)?;
                Ok(self.session(document, None))
            }
        }
    }

    /// Open a PDF whose span tree comes from a separate layout dump.
    pub fn open_with_layout<P: AsRef<Path>, Q: AsRef<Path>>(
        self,
        pdf: P,
        layout: Q,
    ) -> Result<Session> {
        let parser = PdfParser::open_with_options(pdf, self.parse_options.clone())?;
        let document = load_layout(layout, &self.parse_options)?;
        if document.page_count() != parser.page_count() {
            log::warn!(
                "Layout has {} pages, PDF has {}",
                document.page_count(),
                parser.page_count()
            );
        }
        Ok(self.session(document, Some(parser.into_inner())))
    }

    /// Open a PDF from bytes.
    pub fn open_bytes(self, data: &[u8]) -> Result<Session> {
        let parser = PdfParser::from_bytes_with_options(data, self.parse_options.clone())?;
        let document = parser.parse()?;
        Ok(self.session(document, Some(parser.into_inner())))
    }

    fn session(self, document: Document, source: Option<LopdfDocument>) -> Session {
        Session {
            document,
            source,
            annotator: Annotator::new(self.annotate_options),
        }
    }
}

/// An opened document ready for annotation.
pub struct Session {
    document: Document,
    source: Option<LopdfDocument>,
    annotator: Annotator,
}

impl Session {
    /// The span tree.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Whether the session can write a PDF.
    pub fn has_pdf(&self) -> bool {
        self.source.is_some()
    }

    /// Located markers after removing the reference list.
    pub fn markers(&self) -> Vec<Occurrence> {
        self.annotator.markers(&self.document).1
    }

    /// Run the pipeline with a resolver.
    pub fn annotate(&self, resolver: &dyn Resolver) -> Result<Annotated> {
        self.annotator.run(&self.document, resolver)
    }

    /// Build the annotated PDF.
    pub fn write(&self, annotated: &Annotated) -> Result<LopdfDocument> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| Error::Render("no source PDF to write".to_string()))?;
        render::write_pdf(source, &annotated.transformed)
    }

    /// Build the annotated PDF and save it.
    pub fn save<P: AsRef<Path>>(&self, annotated: &Annotated, path: P) -> Result<()> {
        let mut doc = self.write(annotated)?;
        render::pdf::save(&mut doc, path)
    }
}
