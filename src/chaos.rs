//! Fault injection for the multiplication engine
//!
//! A [`ChaosConfig`] describes which resource acquisitions should fail during
//! a run. The store consults it before every allocation and the worker pool
//! consults it before every spawn, which lets tests drive each rollback path
//! of the lifecycle deterministically.
//!
//! # Examples
//!
//! ```
//! use tormenta::chaos::ChaosConfig;
//!
//! // No faults: the default for production runs
//! let calm = ChaosConfig::default();
//! assert!(calm.is_calm());
//!
//! // Fail the third allocation (the output matrix) and cap memory at 1 MB
//! let chaos = ChaosConfig::new()
//!     .with_memory_limit(1024 * 1024)
//!     .with_allocation_failure(2)
//!     .build();
//! assert!(chaos.fails_allocation(2));
//! assert!(!chaos.fails_allocation(0));
//! ```

/// Fault plan for one engine
///
/// All faults are disabled by default (a memory limit of 0 means no limit).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaosConfig {
    /// Memory limit in bytes for live matrix storage (0 = no limit)
    pub memory_limit: usize,
    /// Zero-based ordinal of the allocation that should fail
    pub allocation_failure: Option<usize>,
    /// Worker index whose spawn should fail
    pub spawn_failure: Option<usize>,
    /// Worker index that should panic after computing its cells
    pub worker_panic: Option<usize>,
}

impl ChaosConfig {
    /// Create a fault plan with nothing armed
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the bytes of matrix storage a store may hold at once
    ///
    /// # Examples
    ///
    /// ```
    /// use tormenta::chaos::ChaosConfig;
    ///
    /// let config = ChaosConfig::new().with_memory_limit(512 * 1024 * 1024);
    /// assert_eq!(config.memory_limit, 512 * 1024 * 1024);
    /// ```
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    /// Fail the allocation with this zero-based ordinal
    ///
    /// In a full run, ordinal 0 is the left operand, 1 the right operand and
    /// 2 the output matrix.
    pub fn with_allocation_failure(mut self, ordinal: usize) -> Self {
        self.allocation_failure = Some(ordinal);
        self
    }

    /// Fail the spawn of the worker with this index
    ///
    /// # Examples
    ///
    /// ```
    /// use tormenta::chaos::ChaosConfig;
    ///
    /// let config = ChaosConfig::new().with_spawn_failure(3);
    /// assert!(config.fails_spawn(3));
    /// assert!(!config.fails_spawn(2));
    /// ```
    pub fn with_spawn_failure(mut self, worker: usize) -> Self {
        self.spawn_failure = Some(worker);
        self
    }

    /// Make the worker with this index panic before it submits its sums
    pub fn with_worker_panic(mut self, worker: usize) -> Self {
        self.worker_panic = Some(worker);
        self
    }

    /// Ends a `with_*` chain; the plan is already complete
    pub fn build(self) -> Self {
        self
    }

    /// Returns true if no fault is armed
    pub fn is_calm(&self) -> bool {
        *self == Self::default()
    }

    /// Whether allocation number `ordinal` should fail
    pub fn fails_allocation(&self, ordinal: usize) -> bool {
        self.allocation_failure == Some(ordinal)
    }

    /// Whether leasing `requested` more bytes on top of `in_use` breaks the limit
    pub fn exceeds_memory_limit(&self, in_use: usize, requested: usize) -> bool {
        self.memory_limit != 0 && in_use.saturating_add(requested) > self.memory_limit
    }

    /// Whether spawning worker `worker` should fail
    pub fn fails_spawn(&self, worker: usize) -> bool {
        self.spawn_failure == Some(worker)
    }

    /// Whether worker `worker` should panic
    pub fn panics_worker(&self, worker: usize) -> bool {
        self.worker_panic == Some(worker)
    }
}
