//! Tormenta: fork-join parallel dense matrix multiplication
//!
//! **Tormenta** (Spanish: "storm") multiplies two dense `f64` matrices on a
//! fixed set of worker threads and reduces the result to two statistics: the
//! sum of all entries and the Frobenius norm.
//!
//! # Design Principles
//!
//! - **Disjoint writes**: the flattened output index space is split into
//!   contiguous ranges, and each worker owns a `&mut` slice of the output,
//!   so cell writes need no lock
//! - **One critical section**: workers fold a local sum and sum of squares
//!   into the [`Aggregator`](aggregate::Aggregator) once each
//! - **No leaks on failure**: every stage of the [`Engine`] releases what was
//!   acquired before it, newest first, and the store's ledger proves it
//! - **Zero unsafe**: scoped threads and `split_at_mut` do the work
//!
//! # Quick Start
//!
//! ```rust
//! use tormenta::{Engine, EngineConfig, Matrix};
//!
//! let a = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
//! let b = Matrix::from_vec(2, 2, vec![5.0, 6.0, 7.0, 8.0]).unwrap();
//!
//! let mut engine = Engine::new(EngineConfig::new(2).unwrap());
//! let product = engine.multiply(&a, &b).unwrap();
//!
//! assert_eq!(product.matrix.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
//! assert_eq!(product.statistics.sum, 134.0);
//! ```

pub mod aggregate;
pub mod chaos;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod matrix;
pub mod partition;
pub mod pool;
pub mod store;

pub use aggregate::Statistics;
pub use config::{EngineConfig, MAX_THREADS};
pub use engine::{Engine, Operands, Product, Stage};
pub use error::{Result, ThreadJoinError, TormentaError};
pub use matrix::Matrix;
pub use partition::{partition, WorkRange};
pub use store::{MatrixSource, MatrixStore};
