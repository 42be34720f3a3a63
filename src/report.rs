//! Reporter: renders batch outcomes as log lines.
//!
//! Pure side-effecting sink; nothing in the dispatch path depends on it.

use crate::batch::BatchReport;
use crate::upload::UploadOutcome;

/// Emit one line per outcome plus a final batch summary line.
pub fn emit(report: &BatchReport) {
    for outcome in &report.outcomes {
        match outcome {
            UploadOutcome::Succeeded(upload) => {
                tracing::info!(
                    sku = %upload.product.sku,
                    status = upload.state.status,
                    "product imported"
                );
            }
            UploadOutcome::Failed(upload) => {
                tracing::warn!(
                    sku = %upload.product.sku,
                    line = upload.product.line,
                    error = %upload.state.reason.to_error_message(),
                    "product import failed"
                );
            }
        }
    }

    tracing::info!(
        total = report.total,
        succeeded = report.succeeded,
        failed = report.failed,
        elapsed_ms = report.elapsed().num_milliseconds(),
        "batch complete"
    );
}
