//! Execution state machine
//!
//! One [`Executor`] owns one execution slot. Each call to `execute` opens a
//! new execution context; completions are applied only while their context
//! is still current, so a slow superseded computation can never overwrite a
//! newer settlement. The listener fires only when an observable attribute
//! changes value.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use super::{AbortSignal, Execution, ExecutionHandle, ExecutionSnapshot};

/// Change notification callback
pub type Listener = Arc<dyn Fn() + Send + Sync>;

// ─────────────────────────────────────────────────────────────────
// Slot State
// ─────────────────────────────────────────────────────────────────

/// The current execution context
struct ExecutionContext {
    id: u64,
    signal: AbortSignal,
}

struct SlotState<T, E> {
    pending: bool,
    resolved: bool,
    rejected: bool,
    result: Option<T>,
    reason: Option<E>,
    promise: Option<ExecutionHandle>,
    disposed: bool,

    current: Option<ExecutionContext>,

    /// Context invalidated by `clear` while its computation was in flight.
    /// Its completion is discarded but still ends `pending`.
    detached: Option<u64>,

    next_context: u64,
}

impl<T, E> SlotState<T, E>
where
    T: PartialEq,
    E: PartialEq,
{
    fn blank() -> Self {
        Self {
            pending: false,
            resolved: false,
            rejected: false,
            result: None,
            reason: None,
            promise: None,
            disposed: false,
            current: None,
            detached: None,
            next_context: 1,
        }
    }

    fn is_current(&self, context: u64) -> bool {
        self.current.as_ref().map_or(false, |c| c.id == context)
    }

    /// Abort and drop the current context, returning its id
    fn supersede(&mut self) -> Option<u64> {
        let context = self.current.take()?;
        context.signal.abort();
        debug!(context = context.id, "Execution context superseded");
        Some(context.id)
    }

    /// Open a new context, superseding the previous one
    fn begin(&mut self) -> (u64, AbortSignal) {
        self.supersede();
        self.detached = None;

        let id = self.next_context;
        self.next_context += 1;

        let signal = AbortSignal::new();
        self.current = Some(ExecutionContext {
            id,
            signal: signal.clone(),
        });
        (id, signal)
    }

    /// Apply a settlement; returns whether anything observable changed
    fn settle(&mut self, outcome: Result<T, E>) -> bool {
        let changed = match &outcome {
            Ok(value) => {
                self.pending
                    || !self.resolved
                    || self.rejected
                    || self.reason.is_some()
                    || self.result.as_ref() != Some(value)
            }
            Err(reason) => {
                self.pending
                    || self.resolved
                    || !self.rejected
                    || self.result.is_some()
                    || self.reason.as_ref() != Some(reason)
            }
        };

        self.pending = false;
        self.promise = None;

        match outcome {
            Ok(value) => {
                self.resolved = true;
                self.rejected = false;
                self.result = Some(value);
                self.reason = None;
            }
            Err(reason) => {
                self.resolved = false;
                self.rejected = true;
                self.result = None;
                self.reason = Some(reason);
            }
        }

        changed
    }

    /// Reset settlement state; returns whether anything observable changed
    fn reset(&mut self) -> bool {
        let changed =
            self.resolved || self.rejected || self.result.is_some() || self.reason.is_some();

        self.resolved = false;
        self.rejected = false;
        self.result = None;
        self.reason = None;

        changed
    }

    /// End the pending phase; returns whether `pending` flipped
    fn stop_pending(&mut self) -> bool {
        let changed = self.pending;
        self.pending = false;
        self.promise = None;
        changed
    }
}

// ─────────────────────────────────────────────────────────────────
// Slot
// ─────────────────────────────────────────────────────────────────

struct Slot<T, E> {
    state: Mutex<SlotState<T, E>>,
    listener: Listener,
    runtime: Option<Handle>,
}

impl<T, E> Slot<T, E>
where
    T: PartialEq,
    E: PartialEq,
{
    fn notify(&self, changed: bool) {
        if changed {
            (self.listener)();
        } else {
            trace!("State unchanged, notification suppressed");
        }
    }

    /// Apply the outcome of `context` if it is still allowed to have an effect
    fn complete(&self, context: u64, outcome: Result<T, E>) {
        let changed = {
            let mut state = self.state.lock();

            if state.disposed {
                trace!(context, "Completion discarded, executor disposed");
                return;
            }

            if state.is_current(context) {
                state.current = None;
                let label = if outcome.is_ok() { "resolved" } else { "rejected" };
                let changed = state.settle(outcome);
                debug!(context, outcome = label, "Execution settled");
                changed
            } else if state.detached == Some(context) {
                state.detached = None;
                trace!(context, "Completion discarded after clear");
                state.stop_pending()
            } else {
                trace!(context, "Completion discarded, context superseded");
                return;
            }
        };

        self.notify(changed);
    }

    /// End `context` after its computation panicked, keeping the last settlement
    fn abandon(&self, context: u64) {
        let changed = {
            let mut state = self.state.lock();

            if state.disposed {
                return;
            }

            if state.is_current(context) {
                state.current = None;
            } else if state.detached == Some(context) {
                state.detached = None;
            } else {
                trace!(context, "Panicked computation was already superseded");
                return;
            }

            warn!(context, "Deferred computation panicked, pending execution abandoned");
            state.stop_pending()
        };

        self.notify(changed);
    }
}

// ─────────────────────────────────────────────────────────────────
// Executor
// ─────────────────────────────────────────────────────────────────

/// Single-slot execution state machine
///
/// ```no_run
/// # use executor_state::executor::{Executor, Execution};
/// # async fn demo() {
/// let executor: Executor<u32, String> = Executor::new(|| println!("changed"));
///
/// let handle = executor.execute(|signal| {
///     Execution::deferred(async move {
///         if signal.is_aborted() {
///             return Err("cancelled".to_string());
///         }
///         Ok(42)
///     })
/// });
///
/// assert!(executor.pending());
/// if let Some(handle) = handle {
///     handle.await;
/// }
/// assert_eq!(executor.result(), Some(42));
/// # }
/// ```
///
/// Clones share the same slot.
pub struct Executor<T, E> {
    slot: Arc<Slot<T, E>>,
}

impl<T, E> Clone for Executor<T, E> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T, E> Executor<T, E>
where
    T: Clone + PartialEq + Send + 'static,
    E: Clone + PartialEq + Send + 'static,
{
    /// Create a blank executor that calls `listener` on every state change
    ///
    /// Deferred completions are driven by the Tokio runtime entered at
    /// construction, or the one entered when `execute` is called.
    pub fn new<L>(listener: L) -> Self
    where
        L: Fn() + Send + Sync + 'static,
    {
        Self::from_listener(Arc::new(listener))
    }

    /// Same as [`Executor::new`] for an already shared listener
    pub fn from_listener(listener: Listener) -> Self {
        Self::build(listener, Handle::try_current().ok())
    }

    /// Create an executor whose deferred completions run on `runtime`
    pub fn with_runtime<L>(listener: L, runtime: Handle) -> Self
    where
        L: Fn() + Send + Sync + 'static,
    {
        Self::build(Arc::new(listener), Some(runtime))
    }

    fn build(listener: Listener, runtime: Option<Handle>) -> Self {
        Self {
            slot: Arc::new(Slot {
                state: Mutex::new(SlotState::blank()),
                listener,
                runtime,
            }),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────

    /// Run `work` in a new execution context
    ///
    /// The previous context's signal is aborted. A ready outcome settles the
    /// executor before this returns and yields `None`; a deferred one marks
    /// it pending and yields the handle of the completion. Does nothing once
    /// disposed.
    ///
    /// A deferred computation that panics ends `pending` without settling;
    /// the last result or reason stays visible and the handle still resolves.
    pub fn execute<F>(&self, work: F) -> Option<ExecutionHandle>
    where
        F: FnOnce(AbortSignal) -> Execution<T, E>,
    {
        let (context, signal) = {
            let mut state = self.slot.state.lock();
            if state.disposed {
                trace!("Execute ignored, executor disposed");
                return None;
            }
            state.begin()
        };

        debug!(context, "Execution started");

        match work(signal) {
            Execution::Ready(outcome) => {
                self.slot.complete(context, outcome);
                None
            }
            Execution::Deferred(future) => self.defer(context, future),
        }
    }

    fn defer(
        &self,
        context: u64,
        future: BoxFuture<'static, Result<T, E>>,
    ) -> Option<ExecutionHandle> {
        let slot: Weak<Slot<T, E>> = Arc::downgrade(&self.slot);
        let continuation = async move {
            let outcome = AssertUnwindSafe(future).catch_unwind().await;
            match (slot.upgrade(), outcome) {
                (Some(slot), Ok(outcome)) => slot.complete(context, outcome),
                (Some(slot), Err(_)) => slot.abandon(context),
                (None, _) => trace!(context, "Completion discarded, executor dropped"),
            }
        }
        .boxed()
        .shared();

        let handle = ExecutionHandle::new(context, continuation.clone());

        let changed = {
            let mut state = self.slot.state.lock();
            // A context cleared by `work` itself still owns `pending`; its
            // completion is what ends it.
            let owns_pending = state.is_current(context) || state.detached == Some(context);
            if state.disposed || !owns_pending {
                trace!(context, "Deferred work superseded before it was scheduled");
                return None;
            }
            let changed = !state.pending;
            state.pending = true;
            state.promise = Some(handle.clone());
            changed
        };

        self.slot.notify(changed);
        self.spawn(context, continuation);

        Some(handle)
    }

    fn spawn(&self, context: u64, continuation: Shared<BoxFuture<'static, ()>>) {
        let runtime = self
            .slot
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok());

        match runtime {
            Some(runtime) => {
                runtime.spawn(continuation);
            }
            None => debug!(
                context,
                "No Tokio runtime available, completion runs when the handle is polled"
            ),
        }
    }

    /// Settle successfully with `value`, superseding any pending execution
    pub fn resolve(&self, value: T) {
        self.settle_now(Ok(value));
    }

    /// Settle as failed with `reason`, superseding any pending execution
    pub fn reject(&self, reason: E) {
        self.settle_now(Err(reason));
    }

    fn settle_now(&self, outcome: Result<T, E>) {
        let changed = {
            let mut state = self.slot.state.lock();
            if state.disposed {
                return;
            }
            state.supersede();
            state.detached = None;
            state.settle(outcome)
        };

        self.slot.notify(changed);
    }

    /// Forget the last result or reason
    ///
    /// An in-flight computation keeps `pending` and its handle, but its
    /// outcome is discarded on arrival; `pending` drops at that point.
    pub fn clear(&self) {
        let changed = {
            let mut state = self.slot.state.lock();
            if state.disposed {
                return;
            }
            if let Some(context) = state.supersede() {
                if state.pending {
                    state.detached = Some(context);
                }
            }
            debug!("Execution state cleared");
            state.reset()
        };

        self.slot.notify(changed);
    }

    /// Abandon the pending execution, keeping the last settlement visible
    pub fn abort(&self) {
        let changed = {
            let mut state = self.slot.state.lock();
            if state.disposed {
                return;
            }
            state.supersede();
            state.detached = None;

            let changed = state.stop_pending();
            if changed {
                debug!("Pending execution aborted");
            }
            changed
        };

        self.slot.notify(changed);
    }

    /// Permanently deactivate the executor
    ///
    /// Notifies once; later calls to any mutation are silent no-ops.
    pub fn dispose(&self) {
        {
            let mut state = self.slot.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.supersede();
            state.detached = None;
            state.stop_pending();
        }

        debug!("Executor disposed");
        self.slot.notify(true);
    }

    // ─────────────────────────────────────────────────────────────
    // Observable State
    // ─────────────────────────────────────────────────────────────

    /// Whether a deferred computation is outstanding
    pub fn pending(&self) -> bool {
        self.slot.state.lock().pending
    }

    /// Whether the last settlement was a success
    pub fn resolved(&self) -> bool {
        self.slot.state.lock().resolved
    }

    /// Whether the last settlement was a failure
    pub fn rejected(&self) -> bool {
        self.slot.state.lock().rejected
    }

    /// Last successful value
    pub fn result(&self) -> Option<T> {
        self.slot.state.lock().result.clone()
    }

    /// Last failure value
    pub fn reason(&self) -> Option<E> {
        self.slot.state.lock().reason.clone()
    }

    /// Handle of the in-flight deferred computation
    pub fn promise(&self) -> Option<ExecutionHandle> {
        self.slot.state.lock().promise.clone()
    }

    /// Whether `dispose` has been called
    pub fn disposed(&self) -> bool {
        self.slot.state.lock().disposed
    }

    /// All observable attributes at once
    pub fn snapshot(&self) -> ExecutionSnapshot<T, E> {
        let state = self.slot.state.lock();
        ExecutionSnapshot {
            pending: state.pending,
            resolved: state.resolved,
            rejected: state.rejected,
            result: state.result.clone(),
            reason: state.reason.clone(),
            disposed: state.disposed,
            context: state.promise.as_ref().map(ExecutionHandle::context),
        }
    }
}

impl<T, E> Default for Executor<T, E>
where
    T: Clone + PartialEq + Send + 'static,
    E: Clone + PartialEq + Send + 'static,
{
    fn default() -> Self {
        Self::new(|| {})
    }
}

impl<T, E> fmt::Debug for Executor<T, E>
where
    T: fmt::Debug,
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.slot.state.lock();
        f.debug_struct("Executor")
            .field("pending", &state.pending)
            .field("resolved", &state.resolved)
            .field("rejected", &state.rejected)
            .field("result", &state.result)
            .field("reason", &state.reason)
            .field("disposed", &state.disposed)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
