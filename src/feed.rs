//! Record source: reads the delimited product feed.
//!
//! The feed is headerless delimited text, one product per row. Structural
//! problems (file missing, unparseable format) are fatal and abort the run;
//! per-row problems are governed by [`MalformedPolicy`].

use std::path::Path;

use crate::config::MalformedPolicy;
use crate::error::{Result, VolleyError};
use crate::product::{Product, ProductRow};

/// Read every row of the feed file, in file order.
///
/// # Errors
/// - [`VolleyError::SourceUnavailable`] if the file cannot be opened
/// - [`VolleyError::MalformedInput`] if the format is structurally unparseable
pub fn read_rows(path: &Path) -> Result<Vec<ProductRow>> {
    let file = std::fs::File::open(path).map_err(|source| VolleyError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        rows.push(ProductRow {
            line: index as u64 + 1,
            fields: record.iter().map(str::to_string).collect(),
        });
    }

    tracing::debug!(path = %path.display(), rows = rows.len(), "read product feed");
    Ok(rows)
}

/// Read the feed and transform every row into a [`Product`].
///
/// Rows the transformer rejects are handled per `policy`: `Skip` logs a
/// warning and drops the row, `Abort` fails the whole run before any
/// dispatch begins.
pub fn load_products(path: &Path, policy: MalformedPolicy) -> Result<Vec<Product>> {
    let rows = read_rows(path)?;

    let mut products = Vec::with_capacity(rows.len());
    for row in &rows {
        match Product::from_row(row) {
            Ok(product) => products.push(product),
            Err(error @ VolleyError::MalformedRecord { .. }) => match policy {
                MalformedPolicy::Skip => {
                    tracing::warn!(line = row.line, error = %error, "skipping malformed feed row");
                }
                MalformedPolicy::Abort => return Err(error),
            },
            Err(error) => return Err(error),
        }
    }

    Ok(products)
}
