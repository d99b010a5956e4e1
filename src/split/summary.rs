//! Per-page and per-range outcomes, and the run summary built from them

use std::path::PathBuf;

use super::plan::{range_count, OutputRange};

/// A page left out of its output document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPage {
    /// 0-based source page index
    pub index: usize,
    pub reason: String,
}

/// A finalized PDF for one range
#[derive(Debug, Clone)]
pub struct OutputDocument {
    pub range: OutputRange,
    /// Serialized PDF
    pub bytes: Vec<u8>,
    /// Pages actually present in `bytes`
    pub pages_written: usize,
    /// Pages of the range that could not be copied
    pub skipped_pages: Vec<SkippedPage>,
}

impl OutputDocument {
    /// Whether every page of the range made it into the output
    pub fn is_complete(&self) -> bool {
        self.skipped_pages.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// A range for which no output could be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRange {
    pub range: OutputRange,
    pub reason: String,
    /// Pages that had already failed individually before the range was dropped
    pub skipped_pages: Vec<SkippedPage>,
}

/// Result of processing one range
#[derive(Debug, Clone)]
pub enum RangeOutcome {
    Produced(OutputDocument),
    Skipped(SkippedRange),
}

impl RangeOutcome {
    pub fn range(&self) -> OutputRange {
        match self {
            RangeOutcome::Produced(document) => document.range,
            RangeOutcome::Skipped(skipped) => skipped.range,
        }
    }

    pub fn document(&self) -> Option<&OutputDocument> {
        match self {
            RangeOutcome::Produced(document) => Some(document),
            RangeOutcome::Skipped(_) => None,
        }
    }

    pub fn into_document(self) -> Option<OutputDocument> {
        match self {
            RangeOutcome::Produced(document) => Some(document),
            RangeOutcome::Skipped(_) => None,
        }
    }
}

/// A produced document that could not be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub range: OutputRange,
    pub path: PathBuf,
    pub reason: String,
}

/// Aggregated outcome of a split run
#[derive(Debug, Clone, Default)]
pub struct SplitSummary {
    pub page_count: usize,
    pub group_size: usize,
    pub ranges_planned: usize,
    pub documents_produced: usize,
    pub pages_written: usize,
    pub skipped_pages: Vec<SkippedPage>,
    pub skipped_ranges: Vec<SkippedRange>,
    pub written_files: Vec<PathBuf>,
    pub write_failures: Vec<WriteFailure>,
}

impl SplitSummary {
    pub fn new(page_count: usize, group_size: usize) -> Self {
        Self {
            page_count,
            group_size,
            ranges_planned: range_count(page_count, group_size),
            ..Default::default()
        }
    }

    /// Fold one range outcome into the summary
    pub fn record(&mut self, outcome: &RangeOutcome) {
        match outcome {
            RangeOutcome::Produced(document) => {
                self.documents_produced += 1;
                self.pages_written += document.pages_written;
                self.skipped_pages.extend(document.skipped_pages.iter().cloned());
            }
            RangeOutcome::Skipped(skipped) => {
                self.skipped_pages.extend(skipped.skipped_pages.iter().cloned());
                self.skipped_ranges.push(skipped.clone());
            }
        }
    }

    pub fn record_written(&mut self, path: PathBuf) {
        self.written_files.push(path);
    }

    pub fn record_write_failure(&mut self, failure: WriteFailure) {
        self.write_failures.push(failure);
    }

    /// No page, range or write was lost
    pub fn is_complete(&self) -> bool {
        self.skipped_pages.is_empty()
            && self.skipped_ranges.is_empty()
            && self.write_failures.is_empty()
    }
}
