//! End-to-end upload run: feed -> transform -> dispatch -> report.

use crate::batch::BatchReport;
use crate::config::UploadConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::http::HttpClient;
use crate::submit::Submitter;
use crate::{feed, report};

/// Upload every product in the configured feed.
///
/// Generic over the HTTP client so tests can inject a mock. Fatal errors
/// (feed unavailable, unparseable input, a malformed row under the abort
/// policy) surface here before any network call; per-product failures are
/// contained in the returned report.
pub async fn upload_feed<H: HttpClient + 'static>(
    config: &UploadConfig,
    client: H,
) -> Result<BatchReport> {
    let products = feed::load_products(&config.feed_path, config.on_malformed)?;

    tracing::info!(
        feed = %config.feed_path.display(),
        products = products.len(),
        endpoint = %config.target.endpoint,
        "loaded product feed"
    );

    let submitter = Submitter::new(client, config.target.clone());
    let dispatcher = Dispatcher::new(submitter, config.dispatcher.clone());

    let report = dispatcher.run(products).await;
    report::emit(&report);

    Ok(report)
}
