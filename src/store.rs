//! Matrix allocation, loading and release with leak accounting
//!
//! Every matrix a [`MatrixStore`] hands out carries a lease on the store's
//! ledger. Dropping the matrix (directly or through [`MatrixStore::release`])
//! returns the lease, so `outstanding() == 0` after a run proves that nothing
//! leaked, whichever stage failed.
//!
//! # Text format
//!
//! ```text
//! 2 3
//! 1.0 2.0 3.0
//! 4.0 5.0 6.0
//! ```
//!
//! A `rows cols` header followed by `rows * cols` whitespace-separated values
//! in row-major order. Line breaks carry no meaning.
//!
//! # Example
//!
//! ```
//! use tormenta::store::MatrixStore;
//!
//! let store = MatrixStore::new();
//! let mut slot = Some(store.load_str("A", "2 2\n1 2\n3 4\n").unwrap());
//! assert_eq!(store.outstanding(), 1);
//!
//! store.release(&mut slot);
//! store.release(&mut slot); // already empty: no-op
//! assert_eq!(store.outstanding(), 0);
//! ```

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::mem::size_of;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, instrument, trace};

use crate::chaos::ChaosConfig;
use crate::error::{Result, TormentaError};
use crate::matrix::Matrix;

/// Shared bookkeeping for one store's live allocations
#[derive(Debug, Default)]
struct Ledger {
    outstanding: AtomicUsize,
    bytes: AtomicUsize,
    attempts: AtomicUsize,
    released: Mutex<Vec<String>>,
}

/// Claim on a store ledger held by a tracked matrix
#[derive(Debug)]
pub(crate) struct Lease {
    ledger: Arc<Ledger>,
    label: String,
    bytes: usize,
}

impl Lease {
    pub(crate) fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.ledger.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.ledger.bytes.fetch_sub(self.bytes, Ordering::SeqCst);
        self.ledger
            .released
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(std::mem::take(&mut self.label));
        trace!(bytes = self.bytes, "lease returned");
    }
}

/// Where a matrix comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixSource {
    /// A text file in the matrix format
    File(PathBuf),
    /// Matrix text held in memory, with a label for diagnostics
    Inline {
        /// Name used in logs and error messages
        label: String,
        /// Matrix text
        text: String,
    },
}

impl MatrixSource {
    /// Source backed by a file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        MatrixSource::File(path.into())
    }

    /// Source backed by in-memory text
    pub fn inline(label: impl Into<String>, text: impl Into<String>) -> Self {
        MatrixSource::Inline {
            label: label.into(),
            text: text.into(),
        }
    }

    /// Name used in logs, error messages and the release log
    pub fn label(&self) -> String {
        match self {
            MatrixSource::File(path) => path.display().to_string(),
            MatrixSource::Inline { label, .. } => label.clone(),
        }
    }
}

/// Allocates, loads and releases matrices, tracking every live allocation
///
/// Clones share the same ledger.
#[derive(Debug, Clone, Default)]
pub struct MatrixStore {
    ledger: Arc<Ledger>,
    chaos: ChaosConfig,
}

impl MatrixStore {
    /// Store with no fault injection
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that consults `chaos` before every allocation
    pub fn with_chaos(chaos: ChaosConfig) -> Self {
        MatrixStore {
            ledger: Arc::default(),
            chaos,
        }
    }

    /// Reserves zero-filled storage for a `rows x cols` matrix
    ///
    /// # Errors
    ///
    /// Returns `Allocation` if the size overflows, the memory limit would be
    /// exceeded, the allocator refuses the reservation, or the fault plan
    /// targets this allocation. Nothing is leased on failure.
    pub fn allocate(&self, label: &str, rows: usize, cols: usize) -> Result<Matrix> {
        let ordinal = self.ledger.attempts.fetch_add(1, Ordering::SeqCst);
        let refuse = |reason: String| TormentaError::Allocation { rows, cols, reason };

        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| refuse("element count overflows usize".to_string()))?;
        let bytes = len
            .checked_mul(size_of::<f64>())
            .ok_or_else(|| refuse("byte size overflows usize".to_string()))?;

        if self.chaos.fails_allocation(ordinal) {
            return Err(refuse(format!("injected failure at allocation #{ordinal}")));
        }
        if self.chaos.exceeds_memory_limit(self.bytes_in_use(), bytes) {
            return Err(refuse(format!(
                "memory limit of {} bytes exceeded ({} in use, {} requested)",
                self.chaos.memory_limit,
                self.bytes_in_use(),
                bytes
            )));
        }

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| refuse(e.to_string()))?;
        data.resize(len, 0.0);

        self.ledger.outstanding.fetch_add(1, Ordering::SeqCst);
        self.ledger.bytes.fetch_add(bytes, Ordering::SeqCst);
        debug!(label, rows, cols, bytes, ordinal, "allocated matrix");

        let lease = Lease {
            ledger: Arc::clone(&self.ledger),
            label: label.to_string(),
            bytes,
        };
        Ok(Matrix::leased(rows, cols, data, lease))
    }

    /// Reads a matrix in the text format from `reader`
    ///
    /// # Errors
    ///
    /// Returns `Format` for a missing or malformed header, a zero dimension,
    /// or a missing or malformed value; `Io` if reading fails; `Allocation`
    /// if storage cannot be reserved. Storage reserved before the failure is
    /// released before returning.
    #[instrument(skip(self, reader))]
    pub fn load<R: Read>(&self, label: &str, mut reader: R) -> Result<Matrix> {
        let mut text = String::new();
        reader.read_to_string(&mut text).map_err(|e| {
            if e.kind() == ErrorKind::InvalidData {
                TormentaError::Format(format!("{label}: {e}"))
            } else {
                TormentaError::Io {
                    path: label.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        self.load_str(label, &text)
    }

    /// Parses a matrix from in-memory text
    ///
    /// # Errors
    ///
    /// Same as [`MatrixStore::load`], minus `Io`.
    pub fn load_str(&self, label: &str, text: &str) -> Result<Matrix> {
        let mut tokens = text.split_whitespace();
        let rows = parse_dimension(label, tokens.next(), "row count")?;
        let cols = parse_dimension(label, tokens.next(), "column count")?;

        let mut matrix = self.allocate(label, rows, cols)?;
        let expected = matrix.len();
        for (idx, cell) in matrix.as_mut_slice().iter_mut().enumerate() {
            let (row, col) = (idx / cols, idx % cols);
            let token = tokens.next().ok_or_else(|| {
                TormentaError::Format(format!(
                    "{label}: missing value at [{row}][{col}] (expected {expected} values, found {idx})"
                ))
            })?;
            *cell = token.parse::<f64>().map_err(|_| {
                TormentaError::Format(format!(
                    "{label}: invalid value {token:?} at [{row}][{col}]"
                ))
            })?;
        }

        debug!(label, rows, cols, "loaded matrix");
        Ok(matrix)
    }

    /// Opens `path` and reads a matrix from it
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened, otherwise as
    /// [`MatrixStore::load`].
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<Matrix> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let file = File::open(path).map_err(|e| TormentaError::Io {
            path: label.clone(),
            reason: e.to_string(),
        })?;
        self.load(&label, BufReader::new(file))
    }

    /// Loads a matrix from any [`MatrixSource`]
    pub fn load_source(&self, source: &MatrixSource) -> Result<Matrix> {
        match source {
            MatrixSource::File(path) => self.load_path(path),
            MatrixSource::Inline { label, text } => self.load_str(label, text),
        }
    }

    /// Frees the matrix in `slot`, leaving it empty
    ///
    /// Releasing an empty slot is a no-op, so calling this twice is safe.
    pub fn release(&self, slot: &mut Option<Matrix>) {
        if let Some(matrix) = slot.take() {
            debug!(label = matrix.label().unwrap_or("untracked"), "releasing matrix");
            drop(matrix);
        }
    }

    /// Number of leased matrices still alive
    pub fn outstanding(&self) -> usize {
        self.ledger.outstanding.load(Ordering::SeqCst)
    }

    /// Bytes held by leased matrices
    pub fn bytes_in_use(&self) -> usize {
        self.ledger.bytes.load(Ordering::SeqCst)
    }

    /// Number of allocation attempts so far, successful or not
    pub fn allocation_attempts(&self) -> usize {
        self.ledger.attempts.load(Ordering::SeqCst)
    }

    /// Labels of released matrices, oldest release first
    pub fn release_log(&self) -> Vec<String> {
        self.ledger
            .released
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fault plan this store was built with
    pub fn chaos(&self) -> &ChaosConfig {
        &self.chaos
    }
}

fn parse_dimension(label: &str, token: Option<&str>, what: &str) -> Result<usize> {
    let token =
        token.ok_or_else(|| TormentaError::Format(format!("{label}: missing {what} in header")))?;
    let value = token.parse::<usize>().map_err(|_| {
        TormentaError::Format(format!("{label}: invalid {what} {token:?} in header"))
    })?;
    if value == 0 {
        return Err(TormentaError::Format(format!(
            "{label}: {what} must be positive"
        )));
    }
    Ok(value)
}
