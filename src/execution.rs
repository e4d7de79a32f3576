//! Dependency-triggered execution
//!
//! Re-runs work on an executor only when the dependency value it was last
//! run with changes.

use parking_lot::Mutex;
use tracing::trace;

use crate::executor::{AbortSignal, Execution, ExecutionHandle, Executor};

/// Outcome of [`DependentExecution::update`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Dependencies unchanged, nothing ran
    Skipped,

    /// Work ran; carries the handle when it was deferred
    Executed(Option<ExecutionHandle>),
}

impl Update {
    /// Whether the work ran
    pub fn executed(&self) -> bool {
        matches!(self, Update::Executed(_))
    }
}

/// Executor that re-executes when its dependencies change
pub struct DependentExecution<D, T, E> {
    executor: Executor<T, E>,
    deps: Mutex<Option<D>>,
}

impl<D, T, E> DependentExecution<D, T, E>
where
    D: PartialEq,
    T: Clone + PartialEq + Send + 'static,
    E: Clone + PartialEq + Send + 'static,
{
    /// Wrap `executor`; the first [`update`](Self::update) always runs
    pub fn new(executor: Executor<T, E>) -> Self {
        Self {
            executor,
            deps: Mutex::new(None),
        }
    }

    /// Run `work` if `deps` differs from the previous call's value
    pub fn update<F>(&self, deps: D, work: F) -> Update
    where
        F: FnOnce(AbortSignal) -> Execution<T, E>,
    {
        {
            let mut last = self.deps.lock();
            if last.as_ref() == Some(&deps) {
                trace!("Dependencies unchanged, execution skipped");
                return Update::Skipped;
            }
            *last = Some(deps);
        }

        Update::Executed(self.executor.execute(work))
    }

    /// The wrapped executor
    pub fn executor(&self) -> &Executor<T, E> {
        &self.executor
    }

    /// Dispose the wrapped executor
    pub fn dispose(&self) {
        self.executor.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_only_on_change() {
        let execution: DependentExecution<u32, u32, String> =
            DependentExecution::new(Executor::default());

        assert!(execution.update(1, |_| Execution::ok(10)).executed());
        assert_eq!(execution.update(1, |_| Execution::ok(11)), Update::Skipped);
        assert_eq!(execution.executor().result(), Some(10));

        assert!(execution.update(2, |_| Execution::ok(20)).executed());
        assert_eq!(execution.executor().result(), Some(20));
    }

    #[test]
    fn test_dispose_stops_updates() {
        let execution: DependentExecution<&str, u32, String> =
            DependentExecution::new(Executor::default());

        execution.dispose();
        execution.update("a", |_| Execution::ok(1));

        assert!(execution.executor().disposed());
        assert_eq!(execution.executor().result(), None);
    }
}
