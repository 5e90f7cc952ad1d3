//! Fork-join worker pool
//!
//! One scoped thread per [`WorkRange`]. The output buffer is carved with
//! `split_at_mut` into one disjoint slice per range, so workers write their
//! cells without any locking, even when a range starts or ends mid-row. The
//! only shared mutable state is the [`Aggregator`].
//!
//! If a spawn fails, the pool raises the stop flag, joins every worker it
//! already started and reports `ThreadCreate`. A worker that panics is
//! reported as a [`ThreadJoinError`] warning while the remaining workers'
//! contributions still count.

use std::any::Any;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Scope, ScopedJoinHandle};

use tracing::{debug, error, warn};

use crate::aggregate::{Aggregator, Partial};
use crate::chaos::ChaosConfig;
use crate::error::{Result, ThreadJoinError, TormentaError};
use crate::matrix::Matrix;
use crate::partition::WorkRange;

/// How a worker left its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Every cell was computed and the partial was submitted
    Completed {
        /// Cells written
        cells: usize,
    },
    /// The stop flag was observed; nothing was submitted
    Stopped {
        /// Cells written before stopping
        cells: usize,
    },
}

/// What the pool observed while joining its workers
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PoolReport {
    /// Workers that were started
    pub spawned: usize,
    /// Workers that computed their range and submitted
    pub completed: usize,
    /// Workers that observed the stop flag
    pub stopped: usize,
    /// Workers that could not be joined cleanly
    pub warnings: Vec<ThreadJoinError>,
}

/// Everything one worker needs for one run
pub(crate) struct ThreadContext<'a> {
    worker: usize,
    range: WorkRange,
    a: &'a Matrix,
    b: &'a Matrix,
    out: &'a mut [f64],
    aggregator: &'a Aggregator,
    stop: &'a AtomicBool,
    chaos: &'a ChaosConfig,
}

impl ThreadContext<'_> {
    fn run(self) -> WorkerOutcome {
        if self.stop.load(Ordering::Acquire) {
            return WorkerOutcome::Stopped { cells: 0 };
        }

        let out_cols = self.b.cols();
        let mut local = Partial::default();
        for (offset, cell) in self.out.iter_mut().enumerate() {
            if self.stop.load(Ordering::Relaxed) {
                return WorkerOutcome::Stopped { cells: offset };
            }
            let idx = self.range.start + offset;
            let (row, col) = (idx / out_cols, idx % out_cols);
            let value: f64 = self
                .a
                .row(row)
                .iter()
                .zip(self.b.column(col))
                .map(|(x, y)| x * y)
                .sum();
            *cell = value;
            local.add(value);
        }

        if self.chaos.panics_worker(self.worker) {
            panic!("injected fault in worker {}", self.worker);
        }

        self.aggregator.submit(local);
        WorkerOutcome::Completed {
            cells: self.range.len(),
        }
    }
}

/// Computes `out = a × b` over `ranges`, one scoped thread per range
///
/// `ranges` must tile `[0, out.len())` in order, as produced by
/// [`partition`](crate::partition::partition).
///
/// # Errors
///
/// Returns `ThreadCreate` if a worker cannot be spawned. All workers started
/// before the failure have been stopped and joined by then.
///
/// # Panics
///
/// Panics if `ranges` do not cover the output buffer exactly.
pub fn execute(
    a: &Matrix,
    b: &Matrix,
    out: &mut Matrix,
    ranges: &[WorkRange],
    aggregator: &Aggregator,
    chaos: &ChaosConfig,
) -> Result<PoolReport> {
    debug_assert_eq!(a.cols(), b.rows());
    debug_assert_eq!(out.shape(), (a.rows(), b.cols()));

    let stop = AtomicBool::new(false);
    let chunks = split_ranges(out.as_mut_slice(), ranges);

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(ranges.len());

        for (worker, (&range, cells)) in ranges.iter().zip(chunks).enumerate() {
            let ctx = ThreadContext {
                worker,
                range,
                a,
                b,
                out: cells,
                aggregator,
                stop: &stop,
                chaos,
            };

            match spawn_worker(scope, ctx) {
                Ok(handle) => handles.push((worker, range, handle)),
                Err(e) => {
                    error!(
                        worker,
                        started = handles.len(),
                        error = %e,
                        "worker spawn failed, stopping started workers"
                    );
                    stop.store(true, Ordering::Release);
                    for (started, _, handle) in handles {
                        match handle.join() {
                            Ok(outcome) => debug!(worker = started, ?outcome, "joined during rollback"),
                            Err(payload) => warn!(
                                worker = started,
                                reason = %panic_message(payload.as_ref()),
                                "worker panicked during rollback"
                            ),
                        }
                    }
                    return Err(TormentaError::ThreadCreate {
                        worker,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut report = PoolReport {
            spawned: handles.len(),
            ..PoolReport::default()
        };
        for (worker, range, handle) in handles {
            match handle.join() {
                Ok(WorkerOutcome::Completed { cells }) => {
                    debug!(worker, cells, "worker completed");
                    report.completed += 1;
                }
                Ok(WorkerOutcome::Stopped { cells }) => {
                    debug!(worker, cells, "worker stopped");
                    report.stopped += 1;
                }
                Err(payload) => {
                    let failure = ThreadJoinError {
                        worker,
                        range,
                        reason: panic_message(payload.as_ref()),
                    };
                    warn!(%failure, "continuing with partial reduction");
                    report.warnings.push(failure);
                }
            }
        }
        Ok(report)
    })
}

fn spawn_worker<'scope>(
    scope: &'scope Scope<'scope, '_>,
    ctx: ThreadContext<'scope>,
) -> io::Result<ScopedJoinHandle<'scope, WorkerOutcome>> {
    if ctx.chaos.fails_spawn(ctx.worker) {
        return Err(io::Error::other(format!(
            "injected spawn failure for worker {}",
            ctx.worker
        )));
    }
    thread::Builder::new()
        .name(format!("tormenta-worker-{}", ctx.worker))
        .spawn_scoped(scope, move || ctx.run())
}

/// Carves `buffer` into one mutable slice per range
fn split_ranges<'a>(mut rest: &'a mut [f64], ranges: &[WorkRange]) -> Vec<&'a mut [f64]> {
    let total: usize = ranges.iter().map(WorkRange::len).sum();
    assert_eq!(
        total,
        rest.len(),
        "work ranges cover {total} cells but the output has {}",
        rest.len()
    );

    let mut chunks = Vec::with_capacity(ranges.len());
    for range in ranges {
        let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked with a non-string payload".to_string()
    }
}
