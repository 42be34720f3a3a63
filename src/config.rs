//! Configuration surface for an upload run.
//!
//! Feed location, API target, credential, and concurrency limit are all
//! externalized here and populated by the CLI.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dispatch::DispatcherConfig;

/// Policy for feed rows that cannot be transformed into a product.
///
/// Numeric sub-field failures are always fail-soft (the price becomes 0.0);
/// this policy only governs rows that are structurally unusable, such as rows
/// with too few fields or an empty sku.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Log a warning, drop the row, upload the rest of the feed.
    #[default]
    Skip,
    /// Abort the whole run before any dispatch begins.
    Abort,
}

/// The remote API target every product in a batch is submitted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTarget {
    /// Base URL of the marketplace API (e.g., <https://api-seller.ozon.ru>)
    pub endpoint: String,

    /// The path portion of the import URL (e.g., "/v1/product/import")
    pub path: String,

    /// API credential, sent in the `Api-Key` header
    pub api_key: String,
}

/// Full configuration for one upload run.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Path to the delimited product feed
    pub feed_path: PathBuf,

    /// Remote API target and credential
    pub target: ApiTarget,

    /// Dispatcher knobs (concurrency limit, per-request timeout)
    pub dispatcher: DispatcherConfig,

    /// What to do with rows the transformer rejects
    pub on_malformed: MalformedPolicy,
}
