//! Separating body citations from the reference list.
//!
//! A paper's reference list is itself a run of `[1]`, `[2]`, ... markers.
//! Annotating those would be noise, so the occurrences belonging to the list
//! are removed before resolution.

use crate::marker::Occurrence;
use crate::model::Document;

/// Headings that open a reference list.
pub const SECTION_HEADINGS: [&str; 2] = ["References", "Bibliography"];

/// Removes the occurrences that belong to the bibliography itself.
pub trait BibliographyFilter: Send + Sync {
    /// Filter occurrences sorted in reading order. The result keeps that
    /// order and applying the filter again changes nothing.
    fn filter(&self, occurrences: Vec<Occurrence>, document: &Document) -> Vec<Occurrence>;
}

/// Detects the trailing `1, 2, 3, ...` run of citation numbers.
///
/// Scanning backward from the last citation, the run continues while each
/// number is one more than the one before it on the same page with at most
/// one block between them. A run of two or more that starts at 1 is the
/// reference list and is removed. Removal repeats until no such run remains
/// at the end, so a second pass is a no-op.
///
/// Because removal repeats, a body run that ends up last after the list is
/// gone is dropped too: a document citing `[1] [2]` in the text right before
/// a `[1]..[n]` list loses both body markers. Use [`SectionBoundaryFilter`]
/// when the heading is reliable and such runs matter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceRunFilter;

impl SequenceRunFilter {
    pub fn new() -> Self {
        Self
    }

    /// Start position (into `cites`) of the trailing run, if it is a
    /// removable reference list.
    fn trailing_list_start(occurrences: &[Occurrence], cites: &[usize]) -> Option<usize> {
        let number = |pos: usize| occurrences[cites[pos]].number();
        let mut start = cites.len().checked_sub(1)?;

        while start > 0 {
            let prev = &occurrences[cites[start - 1]];
            let cur = &occurrences[cites[start]];
            let consecutive = match (prev.number(), cur.number()) {
                (Some(p), Some(c)) => c.checked_sub(1) == Some(p),
                _ => false,
            };
            if !consecutive
                || prev.page != cur.page
                || prev.block_index.abs_diff(cur.block_index) > 1
            {
                break;
            }
            start -= 1;
        }

        let run_len = cites.len() - start;
        (number(start) == Some(1) && run_len >= 2).then_some(start)
    }
}

impl BibliographyFilter for SequenceRunFilter {
    fn filter(&self, occurrences: Vec<Occurrence>, _document: &Document) -> Vec<Occurrence> {
        let mut cites: Vec<usize> = occurrences
            .iter()
            .enumerate()
            .filter(|(_, o)| o.number().is_some())
            .map(|(i, _)| i)
            .collect();
        let mut removed = vec![false; occurrences.len()];

        while let Some(start) = Self::trailing_list_start(&occurrences, &cites) {
            log::debug!(
                "Removing bibliography run of {} citations starting on page {}",
                cites.len() - start,
                occurrences[cites[start]].page
            );
            for &i in &cites[start..] {
                removed[i] = true;
            }
            cites.truncate(start);
        }

        occurrences
            .into_iter()
            .zip(removed)
            .filter_map(|(o, gone)| (!gone).then_some(o))
            .collect()
    }
}

/// Drops every occurrence on or after the reference section's page.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionBoundaryFilter;

impl SectionBoundaryFilter {
    pub fn new() -> Self {
        Self
    }
}

impl BibliographyFilter for SectionBoundaryFilter {
    fn filter(&self, occurrences: Vec<Occurrence>, document: &Document) -> Vec<Occurrence> {
        let Some(boundary) = find_section_page(document) else {
            return occurrences;
        };
        log::debug!("Reference section starts on page {}", boundary);
        occurrences
            .into_iter()
            .filter(|o| o.page < boundary)
            .collect()
    }
}

/// Index of the last page whose text mentions a reference-list heading.
pub fn find_section_page(document: &Document) -> Option<usize> {
    document
        .pages
        .iter()
        .enumerate()
        .rev()
        .find(|(_, page)| {
            let text = page.text();
            SECTION_HEADINGS.iter().any(|h| text.contains(h))
        })
        .map(|(i, _)| i)
}
