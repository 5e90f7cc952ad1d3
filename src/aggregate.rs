//! Reduction of per-worker sums into global statistics
//!
//! Each worker accumulates a [`Partial`] privately while it computes its
//! cells, then hands it to the [`Aggregator`] exactly once. The aggregator
//! keeps the global sum and sum of squares in one value behind one mutex, so
//! no reader can ever see one updated without the other.
//!
//! # Example
//!
//! ```
//! use tormenta::aggregate::{Aggregator, Partial};
//!
//! let aggregator = Aggregator::new();
//! let mut local = Partial::default();
//! for value in [19.0, 22.0] {
//!     local.add(value);
//! }
//! aggregator.submit(local);
//! aggregator.submit(Partial::from_values(&[43.0, 50.0]));
//!
//! let stats = aggregator.finalize();
//! assert_eq!(stats.sum, 134.0);
//! assert_eq!(stats.sum_of_squares, 5194.0);
//! assert_eq!(stats.contributions, 2);
//! ```

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Running sum and sum of squares owned by a single worker
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Partial {
    sum: f64,
    sum_sq: f64,
}

impl Partial {
    /// Folds one output cell into the running totals
    #[inline]
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Partial over a slice of values
    pub fn from_values(values: &[f64]) -> Self {
        let mut partial = Partial::default();
        for &v in values {
            partial.add(v);
        }
        partial
    }

    /// Running sum
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Running sum of squares
    pub fn sum_sq(&self) -> f64 {
        self.sum_sq
    }
}

/// Global totals; only [`Aggregator::submit`] mutates them
#[derive(Debug, Default)]
struct Totals {
    sum: f64,
    sum_sq: f64,
    contributions: usize,
}

/// The single critical section shared by all workers
#[derive(Debug, Default)]
pub struct Aggregator {
    totals: Mutex<Totals>,
}

/// Final statistics of one multiplication run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    /// Sum of all output entries
    pub sum: f64,
    /// Sum of squares of all output entries
    pub sum_of_squares: f64,
    /// `sqrt(sum_of_squares)`
    pub frobenius_norm: f64,
    /// Number of workers whose partials were folded in
    pub contributions: usize,
}

impl Aggregator {
    /// Aggregator with zeroed totals
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a worker's partial into the global totals as one unit
    ///
    /// A poisoned lock is recovered: the totals are only ever written inside
    /// this method, both fields together, so they cannot be torn.
    pub fn submit(&self, partial: Partial) {
        let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        totals.sum += partial.sum;
        totals.sum_sq += partial.sum_sq;
        totals.contributions += 1;
    }

    /// Consumes the aggregator and computes the final statistics
    ///
    /// Taking `self` by value means no worker can still hold a reference to
    /// submit through.
    pub fn finalize(self) -> Statistics {
        let totals = self
            .totals
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        Statistics {
            sum: totals.sum,
            sum_of_squares: totals.sum_sq,
            frobenius_norm: totals.sum_sq.sqrt(),
            contributions: totals.contributions,
        }
    }
}
