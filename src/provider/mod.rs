//! Executor provider module
//!
//! Hands out one executor per logical key to a consuming layer and disposes
//! executors when their key is evicted.

mod cache;

pub use cache::*;

use crate::executor::Executor;

/// Source of per-key executors
pub trait ExecutorProvider<K, T, E> {
    /// Executor for `key`, created on first use
    fn executor(&self, key: &K) -> Executor<T, E>;

    /// Drop the executor for `key`, disposing it; returns whether it existed
    fn evict(&self, key: &K) -> bool;
}
