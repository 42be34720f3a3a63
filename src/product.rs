//! Product domain types and the feed-row transformer.
//!
//! A [`ProductRow`] is one raw delimited row; [`Product::from_row`] turns it
//! into the immutable payload a dispatch task owns. The transform is a pure
//! function of the row: the same row always yields the same product.

use serde::Serialize;

use crate::error::{Result, VolleyError};

/// One raw row from the product feed, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    /// 1-based line number in the feed, for diagnostics
    pub line: u64,
    /// Ordered text fields as they appeared in the row
    pub fields: Vec<String>,
}

/// One unit of work: a product ready for submission.
///
/// Created from exactly one [`ProductRow`], immutable after creation, and
/// owned by the single dispatch task that processes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    /// Marketplace article / offer identifier (field 0)
    pub sku: String,

    /// Price in the marketplace currency (field 1)
    pub price: f64,

    /// Optional free-text title (field 2)
    pub title: Option<String>,

    /// Feed line this product came from
    pub line: u64,
}

impl Product {
    /// Transform one feed row into a product payload.
    ///
    /// Field layout is positional: `sku,price[,title]`. A row with fewer than
    /// two fields or an empty sku is a [`VolleyError::MalformedRecord`] scoped
    /// to that row alone. Price parsing is fail-soft: an unparseable price
    /// becomes 0.0 with a warning, never an error.
    pub fn from_row(row: &ProductRow) -> Result<Self> {
        if row.fields.len() < 2 {
            return Err(VolleyError::MalformedRecord {
                line: row.line,
                reason: format!("expected at least 2 fields, got {}", row.fields.len()),
            });
        }

        let sku = row.fields[0].trim();
        if sku.is_empty() {
            return Err(VolleyError::MalformedRecord {
                line: row.line,
                reason: "empty sku field".to_string(),
            });
        }

        let price = parse_price(&row.fields[1], row.line, sku);

        let title = row
            .fields
            .get(2)
            .map(|field| field.trim())
            .filter(|field| !field.is_empty())
            .map(str::to_string);

        Ok(Product {
            sku: sku.to_string(),
            price,
            title,
            line: row.line,
        })
    }
}

/// Parse a price field, substituting 0.0 when the text is not a number.
///
/// A malformed price must not abort the batch: the row is still uploaded,
/// just with a zero price, and the condition is logged.
fn parse_price(raw: &str, line: u64, sku: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(price) => price,
        Err(error) => {
            tracing::warn!(
                line,
                sku,
                raw,
                error = %error,
                "unparseable price, substituting 0.0"
            );
            0.0
        }
    }
}
