//! End-to-end tests for the annotation pipeline on synthetic documents.

use marginalia::bibliography::{BibliographyFilter, SectionBoundaryFilter, SequenceRunFilter};
use marginalia::resolve::{in_document, DefinitionTable};
use marginalia::{
    AnnotateOptions, Annotator, BibliographyStrategy, Block, Column, Document, DocumentContext,
    EntryStatus, FallbackResolver, Line, MarkerKind, MarkerLocator, MarkerSelection, MarkerValue,
    Occurrence, Page, Rect, Resolution, Span, SpanIndex,
};

fn text_block(x0: f32, y0: f32, lines: &[&str]) -> Block {
    Block::from_lines(
        lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let y = y0 + i as f32 * 12.0;
                Line::from_spans(vec![Span::new(*text, Rect::new(x0, y, x0 + 230.0, y + 10.0))])
            })
            .collect(),
    )
}

/// Body citation `[3]` on page 0 and a reference list on page 5.
fn paper_with_listing() -> Document {
    let mut doc = Document::new();

    let mut body = Page::new(0, 600.0, 800.0);
    body.add_block(text_block(50.0, 80.0, &["Introduction"]));
    body.add_block(text_block(50.0, 100.0, &["Margins are often", "too narrow."]));
    body.add_block(text_block(
        50.0,
        140.0,
        &["Earlier systems", "were evaluated in [3] on", "a larger corpus."],
    ));
    body.add_block(text_block(320.0, 100.0, &["Right column text", "continues here."]));
    doc.add_page(body);

    for _ in 1..5 {
        doc.add_page(Page::new(0, 600.0, 800.0));
    }

    let mut refs = Page::new(0, 600.0, 800.0);
    refs.add_block(text_block(50.0, 60.0, &["References"]));
    refs.add_block(text_block(50.0, 80.0, &["[1] A. Author. First paper."]));
    refs.add_block(text_block(50.0, 100.0, &["[2] B. Author. Second paper."]));
    refs.add_block(text_block(50.0, 120.0, &["[3] C. Author. Third paper."]));
    refs.add_block(text_block(50.0, 140.0, &["[4] D. Author. Fourth paper."]));
    doc.add_page(refs);

    doc
}

#[test]
fn test_body_citation_survives_reference_listing() {
    let doc = paper_with_listing();
    let (found, kept) = Annotator::default().markers(&doc);

    assert_eq!(found.len(), 5);
    assert_eq!(kept.len(), 1);

    let occ = &kept[0];
    assert_eq!(occ.raw_text, "[3]");
    assert_eq!(occ.value, MarkerValue::Number(3));
    assert_eq!(occ.kind, MarkerKind::Citation);
    assert_eq!(occ.page, 0);
    assert_eq!(occ.block_index, 2);
    assert_eq!(occ.line_index, 1);
    assert_eq!(occ.column, Column::Left);
}

#[test]
fn test_filter_strategies_agree_on_well_formed_document() {
    let doc = paper_with_listing();
    let found = MarkerLocator::citations().locate_document(&doc);

    let by_run = SequenceRunFilter::new().filter(found.clone(), &doc);
    let by_section = SectionBoundaryFilter::new().filter(found, &doc);
    assert_eq!(by_run, by_section);
}

#[test]
fn test_filter_is_idempotent() {
    let doc = paper_with_listing();
    let filter = SequenceRunFilter::new();
    let once = filter.filter(MarkerLocator::citations().locate_document(&doc), &doc);
    let twice = filter.filter(once.clone(), &doc);
    assert_eq!(once, twice);
}

#[test]
fn test_body_citation_is_annotated_from_reference_list() {
    let doc = paper_with_listing();
    let annotated = Annotator::new(AnnotateOptions::new().sequential())
        .run(&doc, &in_document())
        .unwrap();

    assert_eq!(annotated.report.placed, 1);
    let page = annotated.transformed.page(0).unwrap();
    assert_eq!(page.annotations.len(), 1);

    let annotation = &page.annotations[0];
    assert_eq!(annotation.label, "Ref [3]");
    assert!(annotation.text.starts_with("Ref [3]: C. Author. Third paper."));
    // dark red for in-document answers
    assert_eq!(annotation.color, [0.5, 0.0, 0.0]);

    // left column annotations stay left of the scaled content
    let (scaled_x0, _) = page.scaled_bounds();
    assert!(annotation.bbox.x1 <= scaled_x0);
    assert!(annotation.bbox.x0 >= 0.0);
    assert_eq!(annotation.bbox.y0, 152.0);
}

#[test]
fn test_abbreviation_tokens() {
    let mut doc = Document::new();
    let mut page = Page::new(0, 600.0, 800.0);
    page.add_block(text_block(
        50.0,
        100.0,
        &["NASA (National Aeronautics and Space Administration)", "uses AI under ISO-IEC rules."],
    ));
    doc.add_page(page);

    let options = AnnotateOptions::new().with_markers(MarkerSelection::Abbreviations);
    let (found, _) = Annotator::new(options.clone()).markers(&doc);
    let tokens: Vec<&str> = found.iter().map(|o| o.raw_text.as_str()).collect();

    assert!(tokens.contains(&"NASA"));
    assert!(!tokens.contains(&"AI"));
    assert!(!tokens.contains(&"ISO-IEC"));

    let annotated = Annotator::new(options.sequential())
        .run(&doc, &in_document())
        .unwrap();
    let nasa = annotated
        .report
        .entries
        .iter()
        .find(|e| e.label == "NASA")
        .unwrap();
    assert!(matches!(nasa.status, EntryStatus::Placed { .. }));
}

#[test]
fn test_empty_pages_do_not_fail() {
    let mut doc = Document::new();
    for _ in 0..3 {
        doc.add_page(Page::new(0, 600.0, 800.0));
    }

    let indexes = SpanIndex::build_all(&doc);
    assert!(indexes.iter().all(SpanIndex::is_empty));

    let annotated = Annotator::default().run(&doc, &in_document()).unwrap();
    assert_eq!(annotated.report.occurrences_found, 0);
    assert_eq!(annotated.transformed.page_count(), 3);
    for page in &annotated.transformed.pages {
        assert!(page.matrix.is_identity());
        assert_eq!(page.scale, 1.0);
    }
}

#[test]
fn test_document_without_bibliography_is_unfiltered() {
    let mut doc = Document::new();
    let mut page = Page::new(0, 600.0, 800.0);
    page.add_block(text_block(50.0, 100.0, &["See [2] and [5] and [4]."]));
    doc.add_page(page);

    for strategy in [
        BibliographyStrategy::SequenceRun,
        BibliographyStrategy::SectionBoundary,
    ] {
        let (found, kept) =
            Annotator::new(AnnotateOptions::new().with_bibliography(strategy)).markers(&doc);
        assert_eq!(found, kept);
        assert_eq!(kept.len(), 3);
    }
}

#[test]
fn test_only_bibliography_yields_nothing() {
    let mut doc = Document::new();
    let mut page = Page::new(0, 600.0, 800.0);
    page.add_block(text_block(50.0, 60.0, &["References"]));
    page.add_block(text_block(50.0, 80.0, &["[1] One."]));
    page.add_block(text_block(50.0, 100.0, &["[2] Two."]));
    doc.add_page(page);

    let annotated = Annotator::default().run(&doc, &in_document()).unwrap();
    assert_eq!(annotated.report.occurrences_found, 2);
    assert_eq!(annotated.report.occurrences_kept, 0);
    assert_eq!(annotated.transformed.annotation_count(), 0);
}

#[test]
fn test_scale_one_keeps_geometry() {
    let doc = paper_with_listing();
    let annotated = Annotator::new(AnnotateOptions::new().with_scale(1.0))
        .run(&doc, &in_document())
        .unwrap();

    let page = annotated.transformed.page(0).unwrap();
    assert!(page.matrix.is_identity());
    assert_eq!(page.blocks, doc.pages[0].blocks);
}

#[test]
fn test_fallback_definitions_are_low_confidence() {
    let mut doc = Document::new();
    let mut page = Page::new(0, 600.0, 800.0);
    page.add_block(text_block(50.0, 100.0, &["As shown in [7]."]));
    page.add_block(text_block(320.0, 300.0, &["Other text."]));
    doc.add_page(page);

    let table = DefinitionTable::from_json(r#"{"7": "An external source."}"#).unwrap();
    let resolver = FallbackResolver::new(in_document(), table);
    let annotated = Annotator::new(AnnotateOptions::new().sequential())
        .run(&doc, &resolver)
        .unwrap();

    let entry = &annotated.report.entries[0];
    assert_eq!(
        entry.status,
        EntryStatus::Placed {
            bbox: annotated.transformed.pages[0].annotations[0].bbox,
            truncated: false,
            low_confidence: true,
        }
    );
    assert_eq!(
        annotated.transformed.pages[0].annotations[0].color,
        [0.0, 0.5, 0.0]
    );
}

#[test]
fn test_original_document_is_untouched() {
    let doc = paper_with_listing();
    let before = doc.clone();
    let _ = Annotator::default().run(&doc, &in_document()).unwrap();
    assert_eq!(doc, before);
}

#[test]
fn test_repeated_marker_on_same_line_collides() {
    let mut doc = Document::new();
    let mut page = Page::new(0, 600.0, 800.0);
    page.add_block(text_block(50.0, 100.0, &["Both [1] and [1] again."]));
    page.add_block(text_block(320.0, 300.0, &["Filler."]));
    doc.add_page(page);

    let mut table = DefinitionTable::new();
    table.insert("1", "The only source.");
    let annotated = Annotator::new(AnnotateOptions::new().sequential())
        .run(&doc, &table)
        .unwrap();

    let report = &annotated.report;
    assert_eq!(report.placed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.collisions().count(), 1);
}

#[test]
fn test_pages_are_identified_by_position() {
    // page numbers that disagree with the page order
    let mut body = Page::new(7, 600.0, 800.0);
    body.add_block(text_block(50.0, 100.0, &["Prior work, see [3] for details."]));
    let mut refs = Page::new(7, 600.0, 800.0);
    refs.add_block(text_block(50.0, 60.0, &["References"]));
    refs.add_block(text_block(50.0, 80.0, &["[1] One."]));
    refs.add_block(text_block(50.0, 100.0, &["[2] Two."]));
    let doc = Document {
        pages: vec![body, refs],
    };

    fn always(_: &Occurrence, _: &DocumentContext<'_>) -> Option<Resolution> {
        Some(Resolution::confident("Found."))
    }
    for strategy in [
        BibliographyStrategy::SequenceRun,
        BibliographyStrategy::SectionBoundary,
    ] {
        let annotator = Annotator::new(
            AnnotateOptions::new()
                .with_bibliography(strategy)
                .sequential(),
        );
        let (found, kept) = annotator.markers(&doc);
        assert_eq!(found.iter().map(|o| o.page).collect::<Vec<_>>(), vec![0, 1, 1]);
        assert_eq!(kept.len(), 1);

        let annotated = annotator.run(&doc, &always).unwrap();
        assert_eq!(annotated.report.placed, 1);
        assert!(matches!(
            annotated.report.entries[0].status,
            EntryStatus::Placed { .. }
        ));
        assert_eq!(annotated.transformed.pages[0].annotations.len(), 1);
        assert_eq!(annotated.transformed.pages[1].index, 1);
    }
}
