//! Writing annotated PDFs.
//!
//! Each page's original content is wrapped in a save/restore pair with the
//! page's margin transform applied, and the annotations are drawn after it
//! in Helvetica. The source document is cloned and never modified.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId, Stream, StringFormat};

use crate::error::{Error, Result};
use crate::model::Rect;
use crate::parser::page_box;
use crate::transform::{TransformedDocument, TransformedPage};

/// Resource name of the annotation font.
const FONT_NAME: &str = "MgHelv";

/// Upper bound on page-tree depth when resolving inherited resources.
const MAX_TREE_DEPTH: usize = 32;

/// Apply transforms and annotations to a copy of `source`.
pub fn write_pdf(source: &LopdfDocument, transformed: &TransformedDocument) -> Result<LopdfDocument> {
    let mut doc = source.clone();
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

    if pages.len() != transformed.page_count() {
        log::warn!(
            "PDF has {} pages but {} were transformed",
            pages.len(),
            transformed.page_count()
        );
    }

    let mut font_id = None;
    for (page_id, page) in pages.into_iter().zip(&transformed.pages) {
        if page.matrix.is_identity() && page.annotations.is_empty() {
            continue;
        }
        if !page.annotations.is_empty() && font_id.is_none() {
            font_id = Some(doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            }));
        }
        rewrite_page(&mut doc, page_id, page, font_id)?;
    }

    Ok(doc)
}

/// Save a document to a file.
pub fn save<P: AsRef<Path>>(doc: &mut LopdfDocument, path: P) -> Result<()> {
    doc.save(path)?;
    Ok(())
}

/// Serialize a document to bytes.
pub fn to_bytes(doc: &mut LopdfDocument) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn rewrite_page(
    doc: &mut LopdfDocument,
    page_id: ObjectId,
    page: &TransformedPage,
    font_id: Option<ObjectId>,
) -> Result<()> {
    let media = page_box(doc, page_id);

    // The model measures x from the media box origin; PDF space does not.
    let tx = page.matrix.e + media.x0 * (1.0 - page.matrix.a);
    let prefix = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(page.matrix.a),
                    0.into(),
                    0.into(),
                    1.into(),
                    Object::Real(tx),
                    0.into(),
                ],
            ),
        ],
    };

    let mut suffix = vec![Operation::new("Q", vec![])];
    if let Some(font_id) = font_id.filter(|_| !page.annotations.is_empty()) {
        register_font(doc, page_id, font_id)?;
        suffix.extend(annotation_ops(page, &media));
    }
    let suffix = Content { operations: suffix };

    let prefix_id = doc.add_object(Stream::new(dictionary! {}, prefix.encode()?));
    let suffix_id = doc.add_object(Stream::new(dictionary! {}, suffix.encode()?));

    let mut contents = vec![Object::Reference(prefix_id)];
    contents.extend(original_contents(doc, page_id)?);
    contents.push(Object::Reference(suffix_id));

    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Contents", Object::Array(contents));
    Ok(())
}

/// Content stream references of a page, flattened.
fn original_contents(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;
    Ok(match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    })
}

/// Text operations drawing every annotation of a page.
fn annotation_ops(page: &TransformedPage, media: &Rect) -> Vec<Operation> {
    let mut ops = Vec::new();
    for annotation in &page.annotations {
        let [r, g, b] = annotation.color;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(FONT_NAME.as_bytes().to_vec()), Object::Real(annotation.font_size)],
        ));
        ops.push(Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ));
        for line in &annotation.lines {
            let x = line.x + media.x0;
            let y = media.y1 - line.baseline;
            ops.push(Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    Object::Real(x),
                    Object::Real(y),
                ],
            ));
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&line.text), StringFormat::Literal)],
            ));
        }
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

/// Latin-1 bytes for the text; anything else becomes `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u8,
            _ => b'?',
        })
        .collect()
}

/// Where a page's resource dictionary lives.
enum ResourcesLocation {
    /// An indirect object, possibly shared with other pages
    Shared(ObjectId),
    /// Inline in the page dictionary
    Inline(Dictionary),
    /// Inherited from the page tree or absent; written into the page
    Local(Dictionary),
}

fn locate_resources(doc: &LopdfDocument, page_id: ObjectId) -> Result<ResourcesLocation> {
    let page = doc.get_dictionary(page_id)?;
    match page.get(b"Resources") {
        Ok(Object::Reference(id)) => return Ok(ResourcesLocation::Shared(*id)),
        Ok(Object::Dictionary(dict)) => return Ok(ResourcesLocation::Inline(dict.clone())),
        _ => {}
    }

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(id) = parent {
        let node = doc.get_dictionary(id)?;
        match node.get(b"Resources") {
            Ok(Object::Reference(r)) => {
                return Ok(ResourcesLocation::Local(doc.get_dictionary(*r)?.clone()))
            }
            Ok(Object::Dictionary(dict)) => return Ok(ResourcesLocation::Local(dict.clone())),
            _ => {}
        }
        depth += 1;
        if depth > MAX_TREE_DEPTH {
            break;
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(ResourcesLocation::Local(Dictionary::new()))
}

/// Make the annotation font available to a page.
fn register_font(doc: &mut LopdfDocument, page_id: ObjectId, font_id: ObjectId) -> Result<()> {
    let location = locate_resources(doc, page_id)?;
    let mut resources = match &location {
        ResourcesLocation::Shared(id) => doc.get_dictionary(*id)?.clone(),
        ResourcesLocation::Inline(dict) | ResourcesLocation::Local(dict) => dict.clone(),
    };

    let fonts = resources.get(b"Font").ok().cloned();
    match fonts {
        Some(Object::Reference(fonts_id)) => {
            doc.get_object_mut(fonts_id)?
                .as_dict_mut()
                .map_err(|_| Error::Render("font resource is not a dictionary".to_string()))?
                .set(FONT_NAME, font_id);
        }
        Some(Object::Dictionary(mut fonts)) => {
            fonts.set(FONT_NAME, font_id);
            resources.set("Font", fonts);
        }
        _ => resources.set("Font", dictionary! { FONT_NAME => font_id }),
    }

    match location {
        ResourcesLocation::Shared(id) => {
            *doc.get_object_mut(id)? = Object::Dictionary(resources);
        }
        ResourcesLocation::Inline(_) | ResourcesLocation::Local(_) => {
            doc.get_object_mut(page_id)?
                .as_dict_mut()?
                .set("Resources", resources);
        }
    }
    Ok(())
}
