//! Work partitioning over the flattened output index space
//!
//! The output matrix of an `m×p` product has `m * p` cells. A cell at
//! `(row, col)` has flattened index `row * p + col`. [`partition`] splits
//! `[0, m * p)` into contiguous, near-equal half-open ranges, one per worker.
//!
//! # Example
//!
//! ```
//! use tormenta::partition::{partition, WorkRange};
//!
//! // 10 cells over 4 workers: the first 10 % 4 = 2 ranges get an extra cell
//! let ranges = partition(10, 4);
//! assert_eq!(
//!     ranges,
//!     vec![
//!         WorkRange::new(0, 3),
//!         WorkRange::new(3, 6),
//!         WorkRange::new(6, 8),
//!         WorkRange::new(8, 10),
//!     ]
//! );
//! ```

use std::ops::Range;

/// Half-open interval `[start, end)` of flattened output indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkRange {
    /// First flattened index (inclusive)
    pub start: usize,
    /// One past the last flattened index
    pub end: usize,
}

impl WorkRange {
    /// Creates a range covering `[start, end)`
    ///
    /// # Panics
    ///
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "WorkRange start {start} exceeds end {end}");
        Self { start, end }
    }

    /// Number of cells in the range
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if the range covers no cells
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if `idx` falls inside the range
    pub fn contains(&self, idx: usize) -> bool {
        self.start <= idx && idx < self.end
    }

    /// The range as a standard library `Range` for iteration
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Number of workers that will actually run
///
/// Clamps `thread_count` down to `total_cells`: a worker with nothing to do
/// is never started.
pub fn effective_workers(total_cells: usize, thread_count: usize) -> usize {
    thread_count.min(total_cells)
}

/// Splits `[0, total_cells)` into contiguous ranges, one per worker
///
/// With `base = total_cells / workers` and `extra = total_cells % workers`,
/// range `i` holds `base + 1` cells for `i < extra` and `base` cells
/// otherwise. Ranges are laid out back to back, so range `i` starts exactly
/// where range `i - 1` ends. The result depends only on the arguments.
///
/// If `thread_count > total_cells` the worker count is clamped to
/// `total_cells`; `total_cells == 0` yields no ranges.
///
/// # Panics
///
/// Panics if `thread_count` is zero. User-supplied thread counts are
/// validated by [`EngineConfig`](crate::config::EngineConfig) long before
/// this point.
pub fn partition(total_cells: usize, thread_count: usize) -> Vec<WorkRange> {
    assert!(thread_count >= 1, "thread_count must be at least 1");

    let workers = effective_workers(total_cells, thread_count);
    if workers == 0 {
        return Vec::new();
    }

    let base = total_cells / workers;
    let extra = total_cells % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 0..workers {
        let size = base + usize::from(i < extra);
        ranges.push(WorkRange::new(start, start + size));
        start += size;
    }

    debug_assert_eq!(start, total_cells);
    ranges
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Property: ranges tile [0, total) exactly, in order, without gaps
        #[test]
        fn prop_ranges_tile_index_space(total in 0usize..5000, threads in 1usize..=64) {
            let ranges = partition(total, threads);

            let mut cursor = 0;
            for r in &ranges {
                prop_assert_eq!(r.start, cursor);
                prop_assert!(!r.is_empty());
                cursor = r.end;
            }
            prop_assert_eq!(cursor, total);
            prop_assert_eq!(ranges.iter().map(WorkRange::len).sum::<usize>(), total);
        }

        /// Property: sizes differ by at most one, larger ranges come first
        #[test]
        fn prop_sizes_balanced(total in 1usize..5000, threads in 1usize..=64) {
            let ranges = partition(total, threads);
            let workers = effective_workers(total, threads);
            prop_assert_eq!(ranges.len(), workers);

            let max = ranges.iter().map(WorkRange::len).max().unwrap_or(0);
            let min = ranges.iter().map(WorkRange::len).min().unwrap_or(0);
            prop_assert!(max - min <= 1);

            let extra = total % workers;
            for (i, r) in ranges.iter().enumerate() {
                let expected = total / workers + usize::from(i < extra);
                prop_assert_eq!(r.len(), expected);
            }
        }
    }
}
