//! executor-state - single-slot async execution state machine
//!
//! An [`Executor`] tracks one possibly repeated asynchronous operation:
//! whether it is pending, resolved or rejected, its last result or failure
//! reason, and which execution context is allowed to settle it. Observers are
//! notified only when visible state actually changes.
//!
//! Around the core:
//! - [`provider`]: per-key executor cache that disposes on eviction
//! - [`debounce`]: cancellable delayed callbacks
//! - [`execution`]: re-execution when dependencies change

pub mod config;
pub mod debounce;
pub mod demo;
pub mod error;
pub mod execution;
pub mod executor;
pub mod logging;
pub mod provider;

pub use error::{Error, Result};
pub use executor::{
    AbortSignal, Execution, ExecutionHandle, ExecutionSnapshot, Executor, Listener,
};
pub use provider::{ExecutorCache, ExecutorProvider};
