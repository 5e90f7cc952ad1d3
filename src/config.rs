//! Engine configuration
//!
//! # Example
//!
//! ```
//! use tormenta::config::{parse_thread_count, EngineConfig, MAX_THREADS};
//!
//! let config = EngineConfig::new(4).unwrap();
//! assert_eq!(config.threads(), 4);
//!
//! assert!(EngineConfig::new(0).is_err());
//! assert!(EngineConfig::new(MAX_THREADS + 1).is_err());
//! assert_eq!(parse_thread_count("8").unwrap(), 8);
//! assert!(parse_thread_count("-2").is_err());
//! ```

use crate::chaos::ChaosConfig;
use crate::error::{Result, TormentaError};

/// Largest thread count the engine accepts
pub const MAX_THREADS: usize = 32;

/// Validated settings for an [`Engine`](crate::engine::Engine)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    threads: usize,
    chaos: ChaosConfig,
}

impl EngineConfig {
    /// Configuration running `threads` workers
    ///
    /// # Errors
    ///
    /// Returns `Config` unless `1 <= threads <= MAX_THREADS`
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(TormentaError::Config(
                "thread count must be greater than 0".to_string(),
            ));
        }
        if threads > MAX_THREADS {
            return Err(TormentaError::Config(format!(
                "thread count cannot exceed {MAX_THREADS} (got {threads})"
            )));
        }
        Ok(EngineConfig {
            threads,
            chaos: ChaosConfig::default(),
        })
    }

    /// Attach a fault plan
    pub fn with_chaos(mut self, chaos: ChaosConfig) -> Self {
        self.chaos = chaos;
        self
    }

    /// Requested number of workers
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Fault plan for the engine's store and pool
    pub fn chaos(&self) -> &ChaosConfig {
        &self.chaos
    }
}

/// Parses a thread count typed by a user and validates its range
///
/// # Errors
///
/// Returns `Config` for non-integer, non-positive or too large values
pub fn parse_thread_count(raw: &str) -> Result<usize> {
    let value: i64 = raw.trim().parse().map_err(|_| {
        TormentaError::Config(format!("thread count must be an integer (got {raw:?})"))
    })?;
    if value <= 0 {
        return Err(TormentaError::Config(
            "thread count must be greater than 0".to_string(),
        ));
    }
    let threads = usize::try_from(value).map_err(|_| {
        TormentaError::Config(format!("thread count cannot exceed {MAX_THREADS} (got {value})"))
    })?;
    EngineConfig::new(threads).map(|config| config.threads())
}
