//! Point-in-time view of an executor

use serde::Serialize;

/// Every observable attribute of an executor, read under one lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionSnapshot<T, E> {
    pub pending: bool,
    pub resolved: bool,
    pub rejected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<E>,
    pub disposed: bool,
    /// Context of the in-flight deferred computation, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<u64>,
}

impl<T, E> ExecutionSnapshot<T, E> {
    /// Short label for logs and demo output
    pub fn status(&self) -> &'static str {
        match (self.disposed, self.pending, self.resolved, self.rejected) {
            (true, ..) => "disposed",
            (_, true, ..) => "pending",
            (_, _, true, _) => "resolved",
            (_, _, _, true) => "rejected",
            _ => "blank",
        }
    }

    /// Whether nothing has settled and nothing is in flight
    pub fn is_blank(&self) -> bool {
        !self.pending && !self.resolved && !self.rejected
    }
}
