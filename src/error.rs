//! Error types for Tormenta operations

use thiserror::Error;

use crate::partition::WorkRange;

/// Result type for Tormenta operations
pub type Result<T> = std::result::Result<T, TormentaError>;

/// Fatal errors that abort a multiplication run
///
/// Every variant is raised only after the engine has released whatever it
/// acquired up to the failing stage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TormentaError {
    /// Storage for a matrix could not be reserved
    #[error("Allocation failed for {rows}x{cols} matrix: {reason}")]
    Allocation {
        /// Requested rows
        rows: usize,
        /// Requested columns
        cols: usize,
        /// Why the reservation was refused
        reason: String,
    },

    /// Malformed or truncated matrix source
    #[error("Malformed matrix source: {0}")]
    Format(String),

    /// Inner dimensions of the operands disagree
    #[error(
        "Dimension mismatch: {a_rows}x{a_cols} × {b_rows}x{b_cols} (inner dimensions {a_cols} and {b_rows} must match)"
    )]
    Dimension {
        /// Rows of the left operand
        a_rows: usize,
        /// Columns of the left operand
        a_cols: usize,
        /// Rows of the right operand
        b_rows: usize,
        /// Columns of the right operand
        b_cols: usize,
    },

    /// Invalid engine configuration (e.g. thread count out of range)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A worker thread could not be started
    #[error("Failed to spawn worker {worker}: {reason}")]
    ThreadCreate {
        /// Index of the worker that failed to start
        worker: usize,
        /// OS or injected failure reason
        reason: String,
    },

    /// A matrix file could not be opened or read
    #[error("IO error reading {path}: {reason}")]
    Io {
        /// Path of the matrix source
        path: String,
        /// Underlying IO error message
        reason: String,
    },
}

impl TormentaError {
    /// Process exit code for this error category
    ///
    /// Zero is reserved for success; every category maps to a distinct code.
    pub fn exit_code(&self) -> u8 {
        match self {
            TormentaError::Config(_) => 2,
            TormentaError::Io { .. } => 3,
            TormentaError::Format(_) => 4,
            TormentaError::Dimension { .. } => 5,
            TormentaError::Allocation { .. } => 6,
            TormentaError::ThreadCreate { .. } => 7,
        }
    }
}

/// A worker that could not be joined cleanly
///
/// Non-fatal: the run still finalizes with the contributions that were
/// submitted, and this value is attached to the result as a warning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Worker {worker} (cells {}..{}) could not be joined: {reason}", .range.start, .range.end)]
pub struct ThreadJoinError {
    /// Index of the failed worker
    pub worker: usize,
    /// Cells the worker was assigned
    pub range: WorkRange,
    /// Panic payload or join failure message
    pub reason: String,
}
