//! Submitted work and the handle to its deferred completion

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;

/// What submitted work hands back to the executor
///
/// `Ready` settles the executor before `execute` returns; `Deferred` marks it
/// pending until the future completes.
pub enum Execution<T, E> {
    /// Outcome known synchronously
    Ready(Result<T, E>),

    /// Outcome produced later by a future
    Deferred(BoxFuture<'static, Result<T, E>>),
}

impl<T, E> Execution<T, E> {
    /// Synchronous success
    pub fn ok(value: T) -> Self {
        Execution::Ready(Ok(value))
    }

    /// Synchronous failure
    pub fn err(reason: E) -> Self {
        Execution::Ready(Err(reason))
    }

    /// Outcome delivered by `future`
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Execution::Deferred(future.boxed())
    }

    /// Whether the outcome is already known
    pub fn is_ready(&self) -> bool {
        matches!(self, Execution::Ready(_))
    }
}

impl<T, E> From<Result<T, E>> for Execution<T, E> {
    fn from(outcome: Result<T, E>) -> Self {
        Execution::Ready(outcome)
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Execution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Execution::Ready(outcome) => f.debug_tuple("Ready").field(outcome).finish(),
            Execution::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Awaitable handle to one deferred completion
///
/// Resolves once the executor has either applied the outcome or discarded it
/// as superseded. Clones share the same continuation; two handles are equal
/// when they belong to the same execution context.
#[derive(Clone)]
pub struct ExecutionHandle {
    context: u64,
    continuation: Shared<BoxFuture<'static, ()>>,
}

impl ExecutionHandle {
    pub(crate) fn new(context: u64, continuation: Shared<BoxFuture<'static, ()>>) -> Self {
        Self {
            context,
            continuation,
        }
    }

    /// Identity of the execution context this handle belongs to
    pub fn context(&self) -> u64 {
        self.context
    }
}

impl Future for ExecutionHandle {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.get_mut().continuation.poll_unpin(cx)
    }
}

impl PartialEq for ExecutionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.context == other.context
    }
}

impl Eq for ExecutionHandle {}

impl fmt::Debug for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionHandle")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_constructors() {
        let ok: Execution<i32, String> = Execution::ok(1);
        assert!(ok.is_ready());

        let err: Execution<i32, String> = Execution::err("bad".into());
        assert!(matches!(err, Execution::Ready(Err(ref e)) if e == "bad"));

        let deferred: Execution<i32, String> = Execution::deferred(async { Ok(2) });
        assert!(!deferred.is_ready());
    }

    #[test]
    fn test_execution_from_result() {
        let execution: Execution<i32, String> = Ok(5).into();
        assert!(matches!(execution, Execution::Ready(Ok(5))));
    }

    #[test]
    fn test_handle_equality_by_context() {
        let continuation = async {}.boxed().shared();
        let a = ExecutionHandle::new(7, continuation.clone());
        let b = ExecutionHandle::new(7, continuation.clone());
        let c = ExecutionHandle::new(8, continuation);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.context(), 7);
    }

    #[tokio::test]
    async fn test_handle_clones_resolve_together() {
        let handle = ExecutionHandle::new(1, async {}.boxed().shared());
        let clone = handle.clone();

        handle.await;
        clone.await;
    }
}
