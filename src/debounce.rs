//! Cancellable delayed callbacks
//!
//! A [`Debouncer`] keeps at most one scheduled callback. Scheduling a new one
//! cancels the previous; dropping the debouncer cancels whatever is left.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::config::DebounceSettings;
use crate::error::{Error, Result};

/// Replacement for a raw timer that is cancelled on drop
pub struct Debouncer {
    scheduled: Mutex<Option<JoinHandle<()>>>,
    default_delay: Duration,
}

impl Debouncer {
    /// Create a debouncer using `default_delay` for [`Debouncer::schedule`]
    pub fn new(default_delay: Duration) -> Self {
        Self {
            scheduled: Mutex::new(None),
            default_delay,
        }
    }

    /// Create a debouncer from configuration
    pub fn from_settings(settings: &DebounceSettings) -> Self {
        Self::new(Duration::from_millis(settings.delay_ms))
    }

    /// Delay used by [`Debouncer::schedule`]
    pub fn default_delay(&self) -> Duration {
        self.default_delay
    }

    /// Run `callback` after `delay`, cancelling any earlier scheduled call
    ///
    /// Must be called from within a Tokio runtime.
    pub fn debounce<F>(&self, delay: Duration, callback: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Runtime(format!("Debounce requires a Tokio runtime: {}", e)))?;

        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });

        if let Some(previous) = self.scheduled.lock().replace(task) {
            previous.abort();
            trace!("Previous debounced call cancelled");
        }
        Ok(())
    }

    /// Run `callback` after the default delay
    pub fn schedule<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.debounce(self.default_delay, callback)
    }

    /// Cancel the scheduled call; returns whether one was still waiting
    pub fn cancel(&self) -> bool {
        match self.scheduled.lock().take() {
            Some(task) => {
                let waiting = !task.is_finished();
                task.abort();
                waiting
            }
            None => false,
        }
    }

    /// Whether a call is scheduled and has not run yet
    pub fn is_scheduled(&self) -> bool {
        self.scheduled
            .lock()
            .as_ref()
            .map_or(false, |task| !task.is_finished())
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::from_settings(&DebounceSettings::default())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(task) = self.scheduled.get_mut().take() {
            task.abort();
        }
    }
}
