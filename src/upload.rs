//! Upload lifecycle using the typestate pattern.
//!
//! Each product's upload progresses through distinct states, enforced at
//! compile time:
//!
//! ```text
//! Upload<Pending> ──admit()──> Upload<Admitted> ──submit()──> Upload<Submitted>
//!                                                                  │
//!                                                                  ├──> Upload<Succeeded>
//!                                                                  └──> Upload<Failed>
//! ```
//!
//! The admission permit is acquired into `Admitted`, carried by `Submitted`,
//! and dropped when the upload reaches a terminal state. Because the permit
//! travels with the state value, every exit path - success, HTTP failure,
//! transport failure - releases it exactly once; there is no per-branch
//! cleanup call to forget.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::http::HttpClient;
use crate::product::Product;
use crate::submit::Submitter;

/// Marker trait for valid upload states.
pub trait UploadState: Send + Sync {}

/// One product's upload, parameterized by its current state.
#[derive(Debug)]
pub struct Upload<T: UploadState> {
    /// The current state of the upload.
    pub state: T,
    /// The product being uploaded.
    pub product: Product,
}

/// Upload is waiting for an admission slot.
#[derive(Debug, Clone, Copy)]
pub struct Pending;

impl UploadState for Pending {}

/// Upload holds an admission slot but has not started its network call.
#[derive(Debug)]
pub struct Admitted {
    pub admitted_at: DateTime<Utc>,
    permit: OwnedSemaphorePermit,
}

impl UploadState for Admitted {}

/// Upload's network call is in flight.
#[derive(Debug)]
pub struct Submitted {
    pub admitted_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    permit: OwnedSemaphorePermit,
}

impl UploadState for Submitted {}

/// Upload completed with a success status.
#[derive(Debug, Clone, Serialize)]
pub struct Succeeded {
    pub status: u16,
    pub admitted_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl UploadState for Succeeded {}

/// Reason why an upload failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum FailureReason {
    /// Network error, timeout, or other transport-level failure.
    Transport { error: String },

    /// Response received with a status code outside the success range.
    HttpStatus { status: u16, body: String },

    /// Failed to construct the request before it could be sent.
    RequestBuild { error: String },

    /// The upload task terminated unexpectedly (panic).
    TaskTerminated,
}

impl FailureReason {
    /// Returns a human-readable error message for this failure reason.
    pub fn to_error_message(&self) -> String {
        match self {
            FailureReason::Transport { error } => format!("transport error: {}", error),
            FailureReason::HttpStatus { status, body } => {
                format!("API returned status code {}: {}", status, body)
            }
            FailureReason::RequestBuild { error } => {
                format!("failed to build upload request: {}", error)
            }
            FailureReason::TaskTerminated => "upload task terminated unexpectedly".to_string(),
        }
    }
}

/// Upload failed.
#[derive(Debug, Clone, Serialize)]
pub struct Failed {
    pub reason: FailureReason,
    pub failed_at: DateTime<Utc>,
}

impl UploadState for Failed {}

/// Terminal result of one upload.
#[derive(Debug)]
pub enum UploadOutcome {
    /// The submission returned a success status.
    Succeeded(Upload<Succeeded>),
    /// The submission failed; the reason is terminal, never retried.
    Failed(Upload<Failed>),
}

impl UploadOutcome {
    /// Sku of the product this outcome belongs to.
    pub fn sku(&self) -> &str {
        match self {
            UploadOutcome::Succeeded(upload) => &upload.product.sku,
            UploadOutcome::Failed(upload) => &upload.product.sku,
        }
    }

    /// Feed line of the product this outcome belongs to.
    pub fn line(&self) -> u64 {
        match self {
            UploadOutcome::Succeeded(upload) => upload.product.line,
            UploadOutcome::Failed(upload) => upload.product.line,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Succeeded(_))
    }

    /// The success status code, if this outcome succeeded.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadOutcome::Succeeded(upload) => Some(upload.state.status),
            UploadOutcome::Failed(_) => None,
        }
    }

    /// The failure reason, if this outcome failed.
    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            UploadOutcome::Succeeded(_) => None,
            UploadOutcome::Failed(upload) => Some(&upload.state.reason),
        }
    }
}

// ============================================================================
// Transitions
// ============================================================================

impl Upload<Pending> {
    /// Create a pending upload for one product.
    pub fn new(product: Product) -> Self {
        Upload {
            state: Pending,
            product,
        }
    }

    /// Wait for an admission slot.
    ///
    /// Suspends until the dispatcher's semaphore grants a permit. The permit
    /// is owned by the returned state and released only when the upload
    /// reaches a terminal state.
    pub async fn admit(self, semaphore: Arc<Semaphore>) -> Upload<Admitted> {
        // The semaphore is owned by the dispatcher and never closed mid-batch.
        let permit = semaphore
            .acquire_owned()
            .await
            .expect("admission semaphore closed");

        Upload {
            state: Admitted {
                admitted_at: Utc::now(),
                permit,
            },
            product: self.product,
        }
    }
}

impl Upload<Admitted> {
    /// Perform the network round trip and transition to a terminal state.
    pub async fn submit<H: HttpClient>(
        self,
        submitter: &Submitter<H>,
        timeout_ms: u64,
    ) -> UploadOutcome {
        let submitted = Upload {
            state: Submitted {
                admitted_at: self.state.admitted_at,
                started_at: Utc::now(),
                permit: self.state.permit,
            },
            product: self.product,
        };

        match submitter.submit(&submitted.product, timeout_ms).await {
            Ok(status) => UploadOutcome::Succeeded(submitted.succeed(status)),
            Err(reason) => UploadOutcome::Failed(submitted.fail(reason)),
        }
    }
}

impl Upload<Submitted> {
    fn succeed(self, status: u16) -> Upload<Succeeded> {
        // Consuming self drops the permit: the admission slot is released here.
        Upload {
            state: Succeeded {
                status,
                admitted_at: self.state.admitted_at,
                started_at: self.state.started_at,
                completed_at: Utc::now(),
            },
            product: self.product,
        }
    }

    fn fail(self, reason: FailureReason) -> Upload<Failed> {
        Upload {
            state: Failed {
                reason,
                failed_at: Utc::now(),
            },
            product: self.product,
        }
    }
}

impl Upload<Failed> {
    /// Synthesize a terminal outcome for a task that died without producing
    /// one. Keeps the one-outcome-per-product invariant intact when a task
    /// panics.
    pub(crate) fn terminated(product: Product) -> Self {
        Upload {
            state: Failed {
                reason: FailureReason::TaskTerminated,
                failed_at: Utc::now(),
            },
            product,
        }
    }
}
