//! Partitioning a page count into output ranges

use std::ops::Range;

use crate::error::{Error, Result};

/// Group size suggested when the caller does not choose one
pub const DEFAULT_GROUP_SIZE: usize = 10;

/// A contiguous half-open span of source pages assigned to one output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputRange {
    /// 0-based position of this range in the plan
    pub index: usize,
    /// First page (0-based, inclusive)
    pub start: usize,
    /// One past the last page
    pub end: usize,
}

impl OutputRange {
    /// Number of pages requested for this range
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 1-based range number, as used in output file names
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn contains(&self, page: usize) -> bool {
        self.pages().contains(&page)
    }

    pub fn pages(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Number of ranges needed to cover `page_count` pages
pub fn range_count(page_count: usize, group_size: usize) -> usize {
    if group_size == 0 {
        return 0;
    }
    page_count.div_ceil(group_size)
}

/// Group size used when none is given: the default, capped by the document length
pub fn default_group_size(page_count: usize) -> usize {
    page_count.clamp(1, DEFAULT_GROUP_SIZE)
}

/// Lazily produced sequence of ranges, in ascending order
#[derive(Debug, Clone)]
pub struct RangePlan {
    page_count: usize,
    group_size: usize,
    next: usize,
    count: usize,
}

/// Plan the ranges for a document of `page_count` pages
pub fn plan_ranges(page_count: usize, group_size: usize) -> Result<RangePlan> {
    if group_size == 0 {
        return Err(Error::InvalidGroupSize(group_size));
    }
    Ok(RangePlan {
        page_count,
        group_size,
        next: 0,
        count: range_count(page_count, group_size),
    })
}

impl RangePlan {
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Total number of ranges, including ones already yielded
    pub fn total(&self) -> usize {
        self.count
    }
}

impl Iterator for RangePlan {
    type Item = OutputRange;

    fn next(&mut self) -> Option<OutputRange> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let start = index * self.group_size;
        let end = start.saturating_add(self.group_size).min(self.page_count);
        Some(OutputRange { index, start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RangePlan {}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(page_count: usize, group_size: usize) -> Vec<(usize, usize)> {
        plan_ranges(page_count, group_size)
            .unwrap()
            .map(|r| (r.start, r.end))
            .collect()
    }

    #[test]
    fn test_twenty_five_by_ten() {
        assert_eq!(spans(25, 10), vec![(0, 10), (10, 20), (20, 25)]);
    }

    #[test]
    fn test_zero_pages() {
        assert!(spans(0, 10).is_empty());
        assert_eq!(range_count(0, 3), 0);
    }

    #[test]
    fn test_group_size_one() {
        assert_eq!(spans(3, 1), vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_group_size_at_least_page_count() {
        assert_eq!(spans(7, 7), vec![(0, 7)]);
        assert_eq!(spans(7, 100), vec![(0, 7)]);
        assert_eq!(spans(7, usize::MAX), vec![(0, 7)]);
    }

    #[test]
    fn test_zero_group_size_rejected() {
        assert!(matches!(
            plan_ranges(5, 0).unwrap_err(),
            Error::InvalidGroupSize(0)
        ));
    }

    #[test]
    fn test_ranges_cover_pages_exactly() {
        for page_count in 0..40 {
            for group_size in 1..12 {
                let plan = plan_ranges(page_count, group_size).unwrap();
                assert_eq!(plan.len(), range_count(page_count, group_size));

                let mut expected_start = 0;
                for (i, range) in plan.enumerate() {
                    assert_eq!(range.index, i);
                    assert_eq!(range.start, expected_start);
                    assert!(!range.is_empty());
                    assert!(range.len() <= group_size);
                    expected_start = range.end;
                }
                assert_eq!(expected_start, page_count);
            }
        }
    }

    #[test]
    fn test_default_group_size() {
        assert_eq!(default_group_size(0), 1);
        assert_eq!(default_group_size(4), 4);
        assert_eq!(default_group_size(250), DEFAULT_GROUP_SIZE);
    }

    #[test]
    fn test_range_helpers() {
        let range = OutputRange {
            index: 1,
            start: 10,
            end: 20,
        };
        assert_eq!(range.number(), 2);
        assert_eq!(range.len(), 10);
        assert!(range.contains(10));
        assert!(!range.contains(20));
    }
}
