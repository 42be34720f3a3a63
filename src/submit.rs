//! Remote submitter: one product in, one classified outcome out.
//!
//! Request construction is a typed serialization step decoupled from
//! transport, so the submitter is testable without a live network call.

use serde::Serialize;
use uuid::Uuid;

use crate::config::ApiTarget;
use crate::error::Result;
use crate::http::HttpClient;
use crate::product::Product;
use crate::upload::FailureReason;

/// Unique identifier for one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubmissionId(pub Uuid);

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display only first 8 characters for readability in logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for SubmissionId {
    fn from(uuid: Uuid) -> Self {
        SubmissionId(uuid)
    }
}

impl std::ops::Deref for SubmissionId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// JSON body of one import request.
#[derive(Debug, Serialize)]
struct ImportBody<'a> {
    sku: &'a str,
    price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

/// The wire-level request handed to the HTTP client.
///
/// Everything the client needs to perform the call is materialized here,
/// including the sku - it is duplicative (it's also in the body), but having
/// it as a field gives the mock client a demux key and the logs a stable
/// correlation handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    /// The ID assigned to this submission attempt.
    pub id: SubmissionId,

    /// Sku of the product being submitted
    pub sku: String,

    /// The base URL of the target endpoint (e.g., <https://api-seller.ozon.ru>)
    pub endpoint: String,

    /// The path portion of the URL (e.g., "/v1/product/import")
    pub path: String,

    /// The request body as a JSON string
    pub body: String,

    /// API credential (sent in the `Api-Key` header)
    pub api_key: String,
}

impl SubmissionRequest {
    /// Build the wire request for one product.
    ///
    /// # Errors
    /// Returns a serialization error if the body cannot be encoded.
    pub fn from_product(product: &Product, target: &ApiTarget) -> Result<Self> {
        let body = serde_json::to_string(&ImportBody {
            sku: &product.sku,
            price: product.price,
            title: product.title.as_deref(),
        })?;

        Ok(SubmissionRequest {
            id: SubmissionId::from(Uuid::new_v4()),
            sku: product.sku.clone(),
            endpoint: target.endpoint.clone(),
            path: target.path.clone(),
            body,
            api_key: target.api_key.clone(),
        })
    }
}

/// Result of one submission: the 2xx status on success, or the classified
/// failure.
pub type SubmissionResult = std::result::Result<u16, FailureReason>;

/// Performs a single submission round trip per product.
///
/// No retry, no backoff: each product gets exactly one outbound call, and the
/// outcome is classified from whatever that call produced.
pub struct Submitter<H: HttpClient> {
    client: H,
    target: ApiTarget,
}

impl<H: HttpClient> Submitter<H> {
    /// Create a submitter for the given target.
    pub fn new(client: H, target: ApiTarget) -> Self {
        Self { client, target }
    }

    /// Submit one product and classify the outcome.
    ///
    /// Classification:
    /// - request construction failed -> `RequestBuild`
    /// - transport/connect/timeout error -> `Transport`
    /// - response with a status outside 200..300 -> `HttpStatus`
    /// - 2xx response -> success (body read and discarded)
    pub async fn submit(&self, product: &Product, timeout_ms: u64) -> SubmissionResult {
        let request = match SubmissionRequest::from_product(product, &self.target) {
            Ok(request) => request,
            Err(error) => {
                return Err(FailureReason::RequestBuild {
                    error: error.to_string(),
                });
            }
        };

        match self.client.execute(&request, timeout_ms).await {
            Ok(response) if (200..300).contains(&response.status) => Ok(response.status),
            Ok(response) => Err(FailureReason::HttpStatus {
                status: response.status,
                body: response.body,
            }),
            Err(error) => Err(FailureReason::Transport {
                error: error.to_string(),
            }),
        }
    }
}
