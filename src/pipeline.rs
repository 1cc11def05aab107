//! End-to-end annotation.
//!
//! The [`Annotator`] runs index, locate, filter, resolve, transform and
//! place in order. Locating and filtering need the whole document; resolving
//! and placing run per occurrence and per page and may run in parallel.

use rayon::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::index::SpanIndex;
use crate::marker::{MarkerKind, MarkerValue, Occurrence};
use crate::model::{Document, Rect};
use crate::options::AnnotateOptions;
use crate::placement::{
    AnnotationLocation, AnnotationPlacer, AnnotationRequest, AnnotationStyle, PlacementOutcome,
    SkipReason,
};
use crate::resolve::{DocumentContext, Resolution, Resolver};
use crate::transform::{MarginTransform, TransformedDocument, TransformedPage};

/// Outcome for one kept occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    /// Written to the margin
    Placed {
        bbox: Rect,
        truncated: bool,
        low_confidence: bool,
    },
    /// Resolved but not written
    Skipped(SkipReason),
    /// The resolver had nothing for it
    Unresolved,
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub occurrence: Occurrence,
    pub label: String,
    #[serde(flatten)]
    pub status: EntryStatus,
}

/// What happened to every marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnnotationReport {
    /// Occurrences located before filtering
    pub occurrences_found: usize,
    /// Occurrences left after removing the reference list
    pub occurrences_kept: usize,
    pub placed: usize,
    pub skipped: usize,
    pub unresolved: usize,
    /// One entry per kept occurrence, in reading order
    pub entries: Vec<ReportEntry>,
}

impl AnnotationReport {
    fn push(&mut self, entry: ReportEntry) {
        match entry.status {
            EntryStatus::Placed { .. } => self.placed += 1,
            EntryStatus::Skipped(_) => self.skipped += 1,
            EntryStatus::Unresolved => self.unresolved += 1,
        }
        self.entries.push(entry);
    }

    /// Entries skipped because of a collision.
    pub fn collisions(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, EntryStatus::Skipped(SkipReason::Collision { .. })))
    }
}

/// A transformed, annotated document and its report.
#[derive(Debug, Clone)]
pub struct Annotated {
    pub transformed: TransformedDocument,
    pub report: AnnotationReport,
}

/// Label written in front of an annotation.
pub fn label_for(occurrence: &Occurrence) -> String {
    match (&occurrence.kind, &occurrence.value) {
        (MarkerKind::Citation, MarkerValue::Number(n)) => format!("Ref [{}]", n),
        _ => occurrence.raw_text.clone(),
    }
}

/// Runs the annotation pipeline on a document.
#[derive(Debug, Clone, Default)]
pub struct Annotator {
    options: AnnotateOptions,
}

impl Annotator {
    pub fn new(options: AnnotateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnnotateOptions {
        &self.options
    }

    /// Located and filtered occurrences: `(found, kept)`.
    pub fn markers(&self, document: &Document) -> (Vec<Occurrence>, Vec<Occurrence>) {
        let indexes = SpanIndex::build_all(document);
        let found = self.options.markers.locator().locate(&indexes);
        let kept = self
            .options
            .bibliography
            .filter()
            .filter(found.clone(), document);
        log::debug!("Located {} markers, kept {}", found.len(), kept.len());
        (found, kept)
    }

    /// Run every stage. Only an invalid configuration fails; problems with
    /// single markers end up in the report.
    pub fn run(&self, document: &Document, resolver: &dyn Resolver) -> Result<Annotated> {
        let transform = MarginTransform::new(self.options.scale)?;
        let (found, kept) = self.markers(document);

        let context = DocumentContext::new(document);
        let resolutions: Vec<Option<Resolution>> = if self.options.parallel {
            kept.par_iter()
                .map(|occ| resolver.resolve(occ, &context))
                .collect()
        } else {
            kept.iter()
                .map(|occ| resolver.resolve(occ, &context))
                .collect()
        };

        let mut transformed = transform.apply(document, self.options.parallel);

        // Requests grouped by page, keeping occurrence order within a page.
        let mut per_page: Vec<Vec<(usize, AnnotationRequest)>> =
            vec![Vec::new(); transformed.page_count()];
        let mut statuses: Vec<Option<EntryStatus>> = vec![None; kept.len()];
        let mut low_confidence = vec![false; kept.len()];

        for (i, (occ, resolution)) in kept.iter().zip(resolutions).enumerate() {
            let Some(resolution) = resolution else {
                log::warn!("No text found for {} on page {}", occ.raw_text, occ.page);
                statuses[i] = Some(EntryStatus::Unresolved);
                continue;
            };
            low_confidence[i] = resolution.low_confidence;

            let request = AnnotationRequest {
                location: AnnotationLocation {
                    page: occ.page,
                    column: occ.column.number(),
                    bbox: occ.bbox,
                },
                label: label_for(occ),
                body: resolution.text,
                style: if resolution.low_confidence {
                    AnnotationStyle::LowConfidence
                } else {
                    AnnotationStyle::Standard
                },
            };

            match per_page.get_mut(occ.page) {
                Some(requests) => requests.push((i, request)),
                None => {
                    statuses[i] = Some(EntryStatus::Skipped(SkipReason::UnknownPage {
                        page: occ.page,
                    }))
                }
            }
        }

        let placer = AnnotationPlacer::new(self.options.font_size, self.options.padding);
        let place_page = |(page, requests): (&mut TransformedPage, &Vec<(usize, AnnotationRequest)>)| {
            requests
                .iter()
                .map(|(i, request)| (*i, placer.place(page, request)))
                .collect::<Vec<_>>()
        };
        let outcomes: Vec<(usize, PlacementOutcome)> = if self.options.parallel {
            transformed
                .pages
                .par_iter_mut()
                .zip(per_page.par_iter())
                .flat_map_iter(place_page)
                .collect()
        } else {
            transformed
                .pages
                .iter_mut()
                .zip(per_page.iter())
                .flat_map(place_page)
                .collect()
        };

        for (i, outcome) in outcomes {
            statuses[i] = Some(match outcome {
                PlacementOutcome::Placed(annotation) => EntryStatus::Placed {
                    bbox: annotation.bbox,
                    truncated: annotation.truncated,
                    low_confidence: low_confidence[i],
                },
                PlacementOutcome::Skipped(reason) => EntryStatus::Skipped(reason),
            });
        }

        let mut report = AnnotationReport {
            occurrences_found: found.len(),
            occurrences_kept: kept.len(),
            ..Default::default()
        };
        for (occurrence, status) in kept.into_iter().zip(statuses) {
            report.push(ReportEntry {
                label: label_for(&occurrence),
                occurrence,
                status: status.unwrap_or(EntryStatus::Unresolved),
            });
        }

        log::debug!(
            "Placed {}, skipped {}, unresolved {}",
            report.placed,
            report.skipped,
            report.unresolved
        );

        Ok(Annotated {
            transformed,
            report,
        })
    }
}
