//! Range-by-range production of output documents
//!
//! Ranges are built strictly in ascending order and only one target
//! document is alive at a time. A page that fails to copy is dropped from
//! its range; a range that fails to finalize is dropped from the run.

use log::{debug, warn};

use super::copy::RangeBuilder;
use super::plan::{plan_ranges, OutputRange, RangePlan};
use super::summary::{OutputDocument, RangeOutcome, SkippedPage, SkippedRange, SplitSummary};
use crate::error::Result;
use crate::pdf::SourceDocument;

/// Lazy sequence of per-range outcomes for one split run
///
/// Not restartable: a new `Splitter` recomputes every range.
pub struct Splitter<'a> {
    source: &'a SourceDocument,
    plan: RangePlan,
}

impl<'a> Splitter<'a> {
    pub fn new(source: &'a SourceDocument, group_size: usize) -> Result<Self> {
        let plan = plan_ranges(source.page_count(), group_size)?;
        debug!(
            "{}: {} pages in {} ranges of up to {}",
            source.source(),
            source.page_count(),
            plan.total(),
            group_size
        );
        Ok(Self { source, plan })
    }

    /// Number of ranges in the whole run
    pub fn total(&self) -> usize {
        self.plan.total()
    }

    pub fn group_size(&self) -> usize {
        self.plan.group_size()
    }

    /// Only the produced documents; skipped ranges have already been logged
    pub fn documents(self) -> impl Iterator<Item = OutputDocument> + 'a {
        self.filter_map(RangeOutcome::into_document)
    }
}

impl Iterator for Splitter<'_> {
    type Item = RangeOutcome;

    fn next(&mut self) -> Option<RangeOutcome> {
        let range = self.plan.next()?;
        Some(build_range(self.source, range))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.plan.size_hint()
    }
}

impl ExactSizeIterator for Splitter<'_> {}

fn build_range(source: &SourceDocument, range: OutputRange) -> RangeOutcome {
    debug!(
        "Building range {} (pages {}-{})",
        range.number(),
        range.start + 1,
        range.end
    );

    let mut builder = RangeBuilder::new(source, range);
    let mut skipped_pages = Vec::new();

    for index in range.pages() {
        let copied = source
            .page_at(index)
            .and_then(|page| builder.add_page(&page));
        if let Err(err) = copied {
            warn!("Skipping page {} of {}: {}", index + 1, source.source(), err);
            skipped_pages.push(SkippedPage {
                index,
                reason: err.to_string(),
            });
        }
    }

    let pages_written = builder.page_count();
    match builder.finish() {
        Ok(bytes) => RangeOutcome::Produced(OutputDocument {
            range,
            bytes,
            pages_written,
            skipped_pages,
        }),
        Err(err) => {
            warn!("Skipping range {}: {}", range.number(), err);
            RangeOutcome::Skipped(SkippedRange {
                range,
                reason: err.to_string(),
                skipped_pages,
            })
        }
    }
}

/// Start a split run over `source`
pub fn split(source: &SourceDocument, group_size: usize) -> Result<Splitter<'_>> {
    Splitter::new(source, group_size)
}

/// Run a whole split, handing each produced document to `on_document`
///
/// The callback runs before the next range is started.
pub fn split_with<F>(
    source: &SourceDocument,
    group_size: usize,
    mut on_document: F,
) -> Result<SplitSummary>
where
    F: FnMut(OutputDocument),
{
    let mut summary = SplitSummary::new(source.page_count(), group_size);
    for outcome in split(source, group_size)? {
        summary.record(&outcome);
        if let RangeOutcome::Produced(document) = outcome {
            on_document(document);
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::{build_damaged_pdf, build_pdf, labels, page_labels, Damage};

    fn open(bytes: &[u8]) -> SourceDocument {
        SourceDocument::from_bytes(bytes, "test").unwrap()
    }

    #[test]
    fn test_twenty_five_pages_by_ten() {
        let source = open(&build_pdf(25));
        let outputs: Vec<_> = split(&source, 10).unwrap().documents().collect();

        let counts: Vec<_> = outputs.iter().map(|d| d.pages_written).collect();
        assert_eq!(counts, vec![10, 10, 5]);
        let spans: Vec<_> = outputs.iter().map(|d| (d.range.start, d.range.end)).collect();
        assert_eq!(spans, vec![(0, 10), (10, 20), (20, 25)]);

        assert_eq!(page_labels(&outputs[0].bytes), labels(1, 10));
        assert_eq!(page_labels(&outputs[2].bytes), labels(21, 25));
    }

    #[test]
    fn test_zero_pages_yields_nothing() {
        let source = open(&build_pdf(0));
        assert_eq!(split(&source, 10).unwrap().count(), 0);
    }

    #[test]
    fn test_zero_group_size_rejected() {
        let source = open(&build_pdf(3));
        assert!(matches!(
            split(&source, 0).err().unwrap(),
            Error::InvalidGroupSize(0)
        ));
    }

    #[test]
    fn test_single_page_groups() {
        let source = open(&build_pdf(3));
        let labels_per_output: Vec<_> = split(&source, 1)
            .unwrap()
            .documents()
            .map(|d| page_labels(&d.bytes))
            .collect();
        assert_eq!(
            labels_per_output,
            vec![labels(1, 1), labels(2, 2), labels(3, 3)]
        );
    }

    #[test]
    fn test_oversized_group_yields_whole_document() {
        let source = open(&build_pdf(6));
        let outputs: Vec<_> = split(&source, 50).unwrap().documents().collect();
        assert_eq!(outputs.len(), 1);
        assert_eq!(page_labels(&outputs[0].bytes), labels(1, 6));
    }

    #[test]
    fn test_round_trip_reproduces_page_sequence() {
        let source = open(&build_pdf(17));
        for group_size in [1, 3, 4, 16, 17] {
            let pages: Vec<String> = split(&source, group_size)
                .unwrap()
                .documents()
                .flat_map(|d| page_labels(&d.bytes))
                .collect();
            assert_eq!(pages, labels(1, 17), "group size {}", group_size);
        }
    }

    #[test]
    fn test_repeated_runs_agree() {
        let source = open(&build_pdf(9));
        let run = || -> Vec<Vec<String>> {
            split(&source, 4)
                .unwrap()
                .documents()
                .map(|d| page_labels(&d.bytes))
                .collect()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_corrupt_page_is_isolated() {
        let bytes = build_damaged_pdf(12, &[(6, Damage::MissingObject)]);
        let source = open(&bytes);
        let outcomes: Vec<_> = split(&source, 5).unwrap().collect();
        assert_eq!(outcomes.len(), 3);

        let outputs: Vec<_> = outcomes
            .into_iter()
            .filter_map(RangeOutcome::into_document)
            .collect();
        assert_eq!(page_labels(&outputs[0].bytes), labels(1, 5));
        assert_eq!(
            page_labels(&outputs[1].bytes),
            vec!["Page 6", "Page 8", "Page 9", "Page 10"]
        );
        assert_eq!(page_labels(&outputs[2].bytes), labels(11, 12));

        assert!(!outputs[1].is_complete());
        assert_eq!(outputs[1].skipped_pages[0].index, 6);
        assert_eq!(outputs[1].pages_written, 4);
    }

    #[test]
    fn test_bad_content_stream_is_isolated() {
        let bytes = build_damaged_pdf(3, &[(0, Damage::BadContents)]);
        let source = open(&bytes);
        let outputs: Vec<_> = split(&source, 3).unwrap().documents().collect();
        assert_eq!(page_labels(&outputs[0].bytes), vec!["Page 2", "Page 3"]);
    }

    #[test]
    fn test_fully_corrupt_range_is_skipped() {
        let bytes = build_damaged_pdf(
            6,
            &[(2, Damage::MissingObject), (3, Damage::BadContents)],
        );
        let source = open(&bytes);

        let mut produced = Vec::new();
        let summary = split_with(&source, 2, |d| produced.push(d)).unwrap();

        assert_eq!(summary.ranges_planned, 3);
        assert_eq!(summary.documents_produced, 2);
        assert_eq!(summary.pages_written, 4);
        assert_eq!(summary.skipped_ranges.len(), 1);
        assert_eq!(summary.skipped_ranges[0].range.start, 2);
        let skipped: Vec<_> = summary.skipped_pages.iter().map(|p| p.index).collect();
        assert_eq!(skipped, vec![2, 3]);

        let spans: Vec<_> = produced.iter().map(|d| d.range.index).collect();
        assert_eq!(spans, vec![0, 2]);
    }
}
