//! Lifecycle manager for one multiplication run
//!
//! A run walks `Idle → Loading → Validating → Planning → Executing →
//! Reducing → Done`. Any failure jumps to `Failed` after every matrix
//! acquired so far has been released, newest first (output, then right
//! operand, then left operand).
//!
//! # Example
//!
//! ```
//! use tormenta::config::EngineConfig;
//! use tormenta::engine::{Engine, Stage};
//! use tormenta::store::MatrixSource;
//!
//! let mut engine = Engine::new(EngineConfig::new(2).unwrap());
//! let a = MatrixSource::inline("A", "2 2\n1 2\n3 4\n");
//! let b = MatrixSource::inline("B", "2 2\n5 6\n7 8\n");
//!
//! let (operands, product) = engine.run(&a, &b).unwrap();
//! assert_eq!(product.matrix.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
//! assert_eq!(format!("{:.2}", product.statistics.sum), "134.00");
//! assert_eq!(format!("{:.6}", product.statistics.frobenius_norm), "72.069411");
//! assert_eq!(engine.stage(), Stage::Done);
//!
//! drop((operands, product));
//! assert_eq!(engine.store().outstanding(), 0);
//! ```

use tracing::{debug, error, instrument, warn};

use crate::aggregate::{Aggregator, Statistics};
use crate::config::EngineConfig;
use crate::error::{Result, ThreadJoinError, TormentaError};
use crate::matrix::Matrix;
use crate::partition::partition;
use crate::pool;
use crate::store::{MatrixSource, MatrixStore};

/// Label the store gives the output matrix
pub const OUTPUT_LABEL: &str = "C";

/// Lifecycle states of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Nothing acquired yet
    Idle,
    /// Reading the input matrices
    Loading,
    /// Checking that the inner dimensions agree
    Validating,
    /// Allocating the output and partitioning the work
    Planning,
    /// Workers computing their ranges
    Executing,
    /// Folding worker totals into the final statistics
    Reducing,
    /// Result handed to the caller
    Done,
    /// A fatal error occurred; everything acquired has been released
    Failed,
}

impl Stage {
    /// Returns true for `Done` and `Failed`
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

/// Input matrices loaded by [`Engine::run`], handed back to the caller
#[derive(Debug)]
pub struct Operands {
    /// Left operand
    pub a: Matrix,
    /// Right operand
    pub b: Matrix,
}

/// Output of a successful run
#[derive(Debug)]
pub struct Product {
    /// `A × B`
    pub matrix: Matrix,
    /// Sum and Frobenius norm of `matrix`
    pub statistics: Statistics,
    /// Workers that were started
    pub workers: usize,
    /// Workers the configuration asked for
    pub requested_workers: usize,
    /// Workers that could not be joined cleanly
    pub warnings: Vec<ThreadJoinError>,
}

impl Product {
    /// Returns true if fewer workers ran than were requested
    pub fn is_clamped(&self) -> bool {
        self.workers < self.requested_workers
    }

    /// Returns true if every worker contributed to the statistics
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Sequences allocation, execution and teardown of multiplication runs
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: MatrixStore,
    stage: Stage,
    history: Vec<Stage>,
}

impl Engine {
    /// Engine whose store and pool follow `config`
    pub fn new(config: EngineConfig) -> Self {
        let store = MatrixStore::with_chaos(config.chaos().clone());
        Engine {
            config,
            store,
            stage: Stage::Idle,
            history: vec![Stage::Idle],
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Store of the latest run
    ///
    /// Every run starts with a fresh store, so fault ordinals, counters and
    /// the release log describe that run only. Matrices handed out by an
    /// earlier run keep returning their storage to that run's ledger.
    pub fn store(&self) -> &MatrixStore {
        &self.store
    }

    /// Current lifecycle stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Stages visited by the latest run, starting with `Idle`
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// Loads both operands, multiplies them and returns everything
    ///
    /// On success the caller owns the operands and the product and may keep
    /// or release them.
    ///
    /// # Errors
    ///
    /// Any fatal [`TormentaError`]. By the time it is returned the engine is
    /// in `Failed` and every matrix it loaded or allocated has been released.
    #[instrument(skip_all, fields(a = %a_src.label(), b = %b_src.label(), threads = self.config.threads()))]
    pub fn run(
        &mut self,
        a_src: &MatrixSource,
        b_src: &MatrixSource,
    ) -> Result<(Operands, Product)> {
        self.begin();

        self.enter(Stage::Loading);
        let a = match self.store.load_source(a_src) {
            Ok(matrix) => matrix,
            Err(e) => return Err(self.fail(e, Vec::new())),
        };
        let b = match self.store.load_source(b_src) {
            Ok(matrix) => matrix,
            Err(e) => return Err(self.fail(e, vec![a])),
        };

        match self.compute(&a, &b) {
            Ok(product) => Ok((Operands { a, b }, product)),
            Err(e) => Err(self.fail(e, vec![a, b])),
        }
    }

    /// Multiplies matrices the caller already owns
    ///
    /// Starts at `Validating`. On failure only the output allocated by the
    /// engine is released; the operands stay with the caller.
    ///
    /// # Errors
    ///
    /// `Dimension`, `Allocation` or `ThreadCreate`.
    #[instrument(skip_all, fields(a = ?a.shape(), b = ?b.shape(), threads = self.config.threads()))]
    pub fn multiply(&mut self, a: &Matrix, b: &Matrix) -> Result<Product> {
        self.begin();
        self.compute(a, b).map_err(|e| self.fail(e, Vec::new()))
    }

    /// Validating through Done; releases the output itself if a later stage fails
    fn compute(&mut self, a: &Matrix, b: &Matrix) -> Result<Product> {
        self.enter(Stage::Validating);
        if a.cols() != b.rows() {
            return Err(TormentaError::Dimension {
                a_rows: a.rows(),
                a_cols: a.cols(),
                b_rows: b.rows(),
                b_cols: b.cols(),
            });
        }

        self.enter(Stage::Planning);
        let mut out = self.store.allocate(OUTPUT_LABEL, a.rows(), b.cols())?;
        let requested = self.config.threads();
        let ranges = partition(out.len(), requested);
        if ranges.len() < requested {
            warn!(
                requested,
                workers = ranges.len(),
                cells = out.len(),
                "fewer output cells than threads, clamping worker count"
            );
        }

        self.enter(Stage::Executing);
        let aggregator = Aggregator::new();
        let report = match pool::execute(a, b, &mut out, &ranges, &aggregator, self.config.chaos())
        {
            Ok(report) => report,
            Err(e) => {
                self.store.release(&mut Some(out));
                return Err(e);
            }
        };

        self.enter(Stage::Reducing);
        if !report.warnings.is_empty() {
            warn!(
                failed = report.warnings.len(),
                workers = report.spawned,
                "finalizing with contributions from cleanly joined workers only"
            );
        }
        let statistics = aggregator.finalize();

        self.enter(Stage::Done);
        debug!(
            sum = statistics.sum,
            frobenius_norm = statistics.frobenius_norm,
            workers = ranges.len(),
            "multiplication finished"
        );
        Ok(Product {
            matrix: out,
            statistics,
            workers: ranges.len(),
            requested_workers: requested,
            warnings: report.warnings,
        })
    }

    fn begin(&mut self) {
        self.store = MatrixStore::with_chaos(self.config.chaos().clone());
        self.stage = Stage::Idle;
        self.history.clear();
        self.history.push(Stage::Idle);
    }

    fn enter(&mut self, stage: Stage) {
        debug!(from = ?self.stage, to = ?stage, "stage transition");
        self.stage = stage;
        self.history.push(stage);
    }

    /// Releases `acquired` newest first, then moves to `Failed`
    fn fail(&mut self, err: TormentaError, mut acquired: Vec<Matrix>) -> TormentaError {
        error!(stage = ?self.stage, error = %err, held = acquired.len(), "run failed, rolling back");
        while let Some(matrix) = acquired.pop() {
            self.store.release(&mut Some(matrix));
        }
        self.enter(Stage::Failed);
        err
    }
}
