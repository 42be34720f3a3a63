//! HTTP client abstraction for making upload requests.
//!
//! This module defines the `HttpClient` trait to abstract HTTP request
//! execution, enabling testability with mock implementations.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::submit::SubmissionRequest;

/// Response from an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as a string
    pub body: String,
}

/// Trait for executing HTTP requests.
///
/// This abstraction allows for different implementations (production vs.
/// testing) and makes the dispatcher testable without real network calls.
#[async_trait]
pub trait HttpClient: Send + Sync + Clone {
    /// Execute a single HTTP request.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The request fails due to network issues
    /// - The request times out
    /// - The URL is invalid
    async fn execute(&self, request: &SubmissionRequest, timeout_ms: u64) -> Result<HttpResponse>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Production HTTP client using reqwest.
#[derive(Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new reqwest-based HTTP client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    #[tracing::instrument(skip(self, request), fields(submission_id = %request.id, sku = %request.sku))]
    async fn execute(&self, request: &SubmissionRequest, timeout_ms: u64) -> Result<HttpResponse> {
        let url = format!("{}{}", request.endpoint, request.path);

        tracing::debug!(url = %url, timeout_ms, "executing upload request");

        let mut req = self
            .client
            .post(&url)
            .timeout(Duration::from_millis(timeout_ms))
            .header("Content-Type", "application/json")
            .body(request.body.clone());

        if !request.api_key.is_empty() {
            req = req.header("Api-Key", &request.api_key);
        }

        let response = req.send().await.map_err(|error| {
            tracing::error!(url = %url, error = %error, "upload request failed");
            error
        })?;

        let status = response.status().as_u16();
        // The response body is read but never interpreted.
        let body = response.text().await?;

        tracing::debug!(status, response_len = body.len(), "upload request completed");

        Ok(HttpResponse { status, body })
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

/// Mock HTTP client for testing.
///
/// Allows configuring predetermined responses per sku without making actual
/// HTTP calls.
///
/// # Example
/// ```ignore
/// let mock = MockHttpClient::new();
/// mock.add_response(
///     "sku-1",
///     Ok(HttpResponse {
///         status: 200,
///         body: r#"{"result":"imported"}"#.to_string(),
///     }),
/// );
/// ```
#[derive(Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, Vec<MockResponse>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    in_flight: Arc<AtomicUsize>,
}

/// A mock response that can optionally wait for a trigger before completing.
enum MockResponse {
    /// Immediate response
    Immediate(Result<HttpResponse>),
    /// Response that waits for a trigger signal before completing
    Triggered {
        response: Result<HttpResponse>,
        trigger: Arc<Mutex<Option<oneshot::Receiver<()>>>>,
    },
}

/// Record of a call made to the mock HTTP client.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub sku: String,
    pub endpoint: String,
    pub path: String,
    pub body: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predetermined response for a sku.
    ///
    /// Multiple responses can be added for the same sku - they will be
    /// returned in FIFO order.
    pub fn add_response(&self, sku: &str, response: Result<HttpResponse>) {
        self.responses
            .lock()
            .entry(sku.to_string())
            .or_default()
            .push(MockResponse::Immediate(response));
    }

    /// Add a response that waits for a manual trigger before completing.
    ///
    /// Returns a sender that when triggered (by sending `()` or dropping)
    /// causes the request to complete with the given response. Useful for
    /// holding requests in flight while asserting on concurrency.
    pub fn add_response_with_trigger(
        &self,
        sku: &str,
        response: Result<HttpResponse>,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.responses
            .lock()
            .entry(sku.to_string())
            .or_default()
            .push(MockResponse::Triggered {
                response,
                trigger: Arc::new(Mutex::new(Some(rx))),
            });
        tx
    }

    /// Get all calls that have been made to this mock client.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Get the number of requests currently in flight (executing).
    ///
    /// This is the observable the concurrency-limit tests assert on.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: &SubmissionRequest, timeout_ms: u64) -> Result<HttpResponse> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        // Guard so the counter drops even if the future is cancelled or panics
        let in_flight = self.in_flight.clone();
        let _guard = InFlightGuard { in_flight };

        self.calls.lock().push(MockCall {
            sku: request.sku.clone(),
            endpoint: request.endpoint.clone(),
            path: request.path.clone(),
            body: request.body.clone(),
            api_key: request.api_key.clone(),
            timeout_ms,
        });

        let mock_response = {
            let mut responses = self.responses.lock();
            match responses.get_mut(&request.sku) {
                Some(queue) if !queue.is_empty() => Some(queue.remove(0)),
                _ => None,
            }
        };

        match mock_response {
            Some(MockResponse::Immediate(response)) => response,
            Some(MockResponse::Triggered { response, trigger }) => {
                let rx = trigger.lock().take();
                if let Some(rx) = rx {
                    // Wait for trigger (we proceed either way if the sender drops)
                    let _ = rx.await;
                }
                response
            }
            None => Err(crate::error::VolleyError::Other(anyhow::anyhow!(
                "no mock response configured for sku {}",
                request.sku
            ))),
        }
    }
}

/// Guard that decrements the in-flight counter when dropped.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
