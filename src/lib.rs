//! Concurrent product feed uploader with bounded-concurrency batch dispatch.
//!
//! This crate reads product records from a delimited feed file and uploads
//! each one to a marketplace HTTP API, issuing many requests concurrently
//! while capping the number in flight. The dispatcher guarantees that every
//! product yields exactly one terminal outcome before the batch returns, and
//! that one failing upload never blocks or corrupts the others.

pub mod batch;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod http;
pub mod product;
pub mod report;
pub mod submit;
pub mod upload;
pub mod uploader;

// Re-export commonly used types
pub use batch::BatchReport;
pub use config::{ApiTarget, MalformedPolicy, UploadConfig};
pub use dispatch::{Dispatcher, DispatcherConfig};
pub use error::{Result, VolleyError};
pub use http::{HttpClient, HttpResponse, MockHttpClient, ReqwestHttpClient};
pub use product::{Product, ProductRow};
pub use submit::{SubmissionRequest, Submitter};
pub use upload::{FailureReason, Upload, UploadOutcome};
pub use uploader::upload_feed;
