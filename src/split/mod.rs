//! Splitting a source document into per-range output documents

pub mod copy;
pub mod plan;
pub mod splitter;
pub mod summary;

// Re-export commonly used items
pub use plan::{default_group_size, plan_ranges, range_count, OutputRange, RangePlan};
pub use splitter::{split, split_with, Splitter};
pub use summary::{
    OutputDocument, RangeOutcome, SkippedPage, SkippedRange, SplitSummary, WriteFailure,
};
