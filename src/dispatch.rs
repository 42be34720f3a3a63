//! Bounded-concurrency batch dispatcher.
//!
//! The dispatcher fans a batch of products out across concurrent upload
//! tasks, admits at most `concurrency` simultaneous in-flight submissions,
//! and returns only once every task has recorded a terminal outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::batch::BatchReport;
use crate::http::HttpClient;
use crate::product::Product;
use crate::submit::Submitter;
use crate::upload::{Upload, UploadOutcome};

/// Configuration for the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum number of submissions in flight at any instant (K >= 1)
    pub concurrency: usize,

    /// Timeout for each individual upload request in milliseconds
    pub timeout_ms: u64,

    /// Interval for logging dispatcher status (uploads in flight) in
    /// milliseconds. Set to None to disable periodic status logging.
    pub status_log_interval_ms: Option<u64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            timeout_ms: 30_000,
            status_log_interval_ms: Some(2_000),
        }
    }
}

/// Dispatcher that drives a batch of uploads under a concurrency limit.
///
/// Admission control is a semaphore with exactly `concurrency` permits; each
/// upload task acquires a permit before its network call and releases it when
/// it reaches a terminal state, on every exit path. A `JoinSet` acts as the
/// completion barrier: [`Dispatcher::run`] returns only after all spawned
/// tasks have been joined, so every product has exactly one recorded outcome.
pub struct Dispatcher<H: HttpClient> {
    submitter: Arc<Submitter<H>>,
    config: DispatcherConfig,
    in_flight: Arc<AtomicUsize>,
}

impl<H: HttpClient + 'static> Dispatcher<H> {
    /// Create a new dispatcher.
    pub fn new(submitter: Submitter<H>, config: DispatcherConfig) -> Self {
        Self {
            submitter: Arc::new(submitter),
            config,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of uploads currently holding an admission slot.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Run the full batch to completion.
    ///
    /// Every product is spawned as its own task up front; the semaphore
    /// bounds how many are actively submitting. Returns after all tasks have
    /// produced a terminal outcome - a task that panics is converted into a
    /// `Failed` outcome rather than dropped, so the report always contains
    /// one outcome per product.
    #[tracing::instrument(skip(self, products), fields(total = products.len(), concurrency = self.config.concurrency))]
    pub async fn run(&self, products: Vec<Product>) -> BatchReport {
        let started_at = Utc::now();
        let total = products.len();

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        tracing::info!("dispatching batch");

        // Spawn periodic status logging task if configured
        let status_log = self.config.status_log_interval_ms.map(|interval_ms| {
            let in_flight = self.in_flight.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
                loop {
                    interval.tick().await;
                    let count = in_flight.load(Ordering::Relaxed);
                    tracing::debug!(in_flight = count, "dispatcher status");
                }
            })
        });

        let mut join_set: JoinSet<UploadOutcome> = JoinSet::new();
        let mut by_task: HashMap<tokio::task::Id, Product> = HashMap::with_capacity(total);

        for product in products {
            let submitter = self.submitter.clone();
            let semaphore = semaphore.clone();
            let in_flight = self.in_flight.clone();
            let timeout_ms = self.config.timeout_ms;
            // Kept so a panicked task can still be attributed to its product.
            let spare = product.clone();

            let handle = join_set.spawn(async move {
                let admitted = Upload::new(product).admit(semaphore).await;

                in_flight.fetch_add(1, Ordering::Relaxed);
                let _guard = scopeguard::guard((), |_| {
                    in_flight.fetch_sub(1, Ordering::Relaxed);
                });

                tracing::debug!(
                    sku = %admitted.product.sku,
                    line = admitted.product.line,
                    "admitted, submitting"
                );

                admitted.submit(submitter.as_ref(), timeout_ms).await
            });
            by_task.insert(handle.id(), spare);
        }

        let mut outcomes = Vec::with_capacity(total);
        let mut succeeded = 0usize;
        let mut failed = 0usize;

        while let Some(result) = join_set.join_next_with_id().await {
            match result {
                Ok((task_id, outcome)) => {
                    by_task.remove(&task_id);
                    match &outcome {
                        UploadOutcome::Succeeded(upload) => {
                            succeeded += 1;
                            tracing::trace!(sku = %upload.product.sku, "upload succeeded");
                        }
                        UploadOutcome::Failed(upload) => {
                            failed += 1;
                            tracing::trace!(sku = %upload.product.sku, "upload failed");
                        }
                    }
                    outcomes.push(outcome);
                }
                Err(join_error) => {
                    tracing::error!(error = %join_error, "upload task panicked");
                    if let Some(product) = by_task.remove(&join_error.id()) {
                        failed += 1;
                        outcomes.push(UploadOutcome::Failed(Upload::terminated(product)));
                    }
                }
            }
        }

        if let Some(handle) = status_log {
            handle.abort();
        }

        tracing::debug!(total, succeeded, failed, "batch drained");

        BatchReport {
            total,
            succeeded,
            failed,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
