//! Built-in demonstration scenarios
//!
//! Each scenario drives a fresh executor through one lifecycle and records
//! the snapshot observed on every notification.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::executor::{Execution, ExecutionSnapshot, Executor};

type DemoExecutor = Executor<i64, String>;
type DemoSnapshot = ExecutionSnapshot<i64, String>;

/// Available scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    SyncResolve,
    AsyncResolve,
    Supersede,
    Abort,
    Clear,
    Dispose,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::SyncResolve,
        Scenario::AsyncResolve,
        Scenario::Supersede,
        Scenario::Abort,
        Scenario::Clear,
        Scenario::Dispose,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::SyncResolve => "sync-resolve",
            Scenario::AsyncResolve => "async-resolve",
            Scenario::Supersede => "supersede",
            Scenario::Abort => "abort",
            Scenario::Clear => "clear",
            Scenario::Dispose => "dispose",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Scenario::ALL
            .iter()
            .copied()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| Error::UnknownScenario { name: s.to_string() })
    }
}

/// What a scenario observed
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: &'static str,

    /// Snapshot taken inside the listener, one per notification
    pub notifications: Vec<DemoSnapshot>,

    pub final_state: DemoSnapshot,
}

/// Captures a snapshot on every notification
struct Recorder {
    executor: Mutex<Option<DemoExecutor>>,
    snapshots: Mutex<Vec<DemoSnapshot>>,
}

impl Recorder {
    fn attach() -> (Arc<Self>, DemoExecutor) {
        let recorder = Arc::new(Self {
            executor: Mutex::new(None),
            snapshots: Mutex::new(Vec::new()),
        });

        let executor = {
            let recorder = recorder.clone();
            Executor::new(move || recorder.record())
        };
        *recorder.executor.lock() = Some(executor.clone());

        (recorder, executor)
    }

    fn record(&self) {
        let snapshot = self.executor.lock().as_ref().map(Executor::snapshot);
        if let Some(snapshot) = snapshot {
            self.snapshots.lock().push(snapshot);
        }
    }

    /// Break the listener/executor cycle and produce the report
    fn finish(&self, scenario: Scenario) -> Result<ScenarioReport> {
        let executor = self
            .executor
            .lock()
            .take()
            .ok_or_else(|| Error::Internal("Recorder already finished".to_string()))?;

        Ok(ScenarioReport {
            scenario: scenario.name(),
            notifications: std::mem::take(&mut *self.snapshots.lock()),
            final_state: executor.snapshot(),
        })
    }
}

fn delayed(value: i64, delay: Duration) -> Execution<i64, String> {
    Execution::deferred(async move {
        tokio::time::sleep(delay).await;
        Ok(value)
    })
}

/// Run one scenario; deferred work sleeps for `delay`
pub async fn run_scenario(scenario: Scenario, delay: Duration) -> Result<ScenarioReport> {
    let (recorder, executor) = Recorder::attach();

    match scenario {
        Scenario::SyncResolve => {
            executor.execute(|_| Execution::ok(123));
        }
        Scenario::AsyncResolve => {
            if let Some(handle) = executor.execute(|_| delayed(123, delay)) {
                handle.await;
            }
        }
        Scenario::Supersede => {
            let slow = executor.execute(|_| delayed(1, delay * 2));
            let fast = executor.execute(|_| delayed(2, delay));
            for handle in [fast, slow].into_iter().flatten() {
                handle.await;
            }
        }
        Scenario::Abort => {
            executor.resolve(123);
            let handle = executor.execute(|_| delayed(456, delay));
            executor.abort();
            if let Some(handle) = handle {
                handle.await;
            }
        }
        Scenario::Clear => {
            executor.resolve(123);
            let handle = executor.execute(|_| delayed(456, delay));
            executor.clear();
            if let Some(handle) = handle {
                handle.await;
            }
        }
        Scenario::Dispose => {
            executor.resolve(1);
            executor.dispose();
            executor.execute(|_| Execution::ok(2));
            executor.reject("ignored".to_string());
            executor.dispose();
        }
    }

    let report = recorder.finish(scenario)?;
    info!(
        scenario = %scenario,
        notifications = report.notifications.len(),
        status = report.final_state.status(),
        "Scenario finished"
    );
    Ok(report)
}

/// Run every scenario in order
pub async fn run_all(delay: Duration) -> Result<Vec<ScenarioReport>> {
    let mut reports = Vec::with_capacity(Scenario::ALL.len());
    for scenario in Scenario::ALL {
        reports.push(run_scenario(scenario, delay).await?);
    }
    Ok(reports)
}
