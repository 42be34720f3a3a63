//! Batch report: the aggregate result of one dispatch run.

use chrono::{DateTime, Utc};

use crate::upload::UploadOutcome;

/// All outcomes from one batch run, plus aggregate counts.
///
/// Holds one outcome per dispatched product - the dispatcher's completion
/// barrier guarantees `outcomes.len() == total` by the time this exists.
#[derive(Debug)]
pub struct BatchReport {
    /// Number of products dispatched
    pub total: usize,
    /// Number of uploads that returned a success status
    pub succeeded: usize,
    /// Number of uploads that failed (transport, HTTP status, or panic)
    pub failed: usize,
    /// Per-product outcomes, in completion order
    pub outcomes: Vec<UploadOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    /// Check that every dispatched product has a terminal outcome.
    pub fn is_complete(&self) -> bool {
        self.succeeded + self.failed == self.total && self.outcomes.len() == self.total
    }

    /// Check whether every upload in the batch succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }

    /// Wall-clock duration of the batch run.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
