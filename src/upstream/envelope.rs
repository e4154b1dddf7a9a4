//! Response-shape normalization for list endpoints.
//!
//! Upstream list endpoints have returned a bare array, `{data: [...]}`,
//! `{cards: [...]}` and `{results: [...]}` at various times. Each endpoint
//! decodes through [`ListEnvelope`] once, then decodes the rows one by one.
//! A row that no longer fits the model is logged and skipped; a body that
//! matches no known shape is an error, so callers fall back to cached or
//! static data instead of caching an empty list.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{PokePriceError, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Bare(Vec<T>),
    Data { data: Vec<T> },
    Cards { cards: Vec<T> },
    Results { results: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(items)
            | ListEnvelope::Data { data: items }
            | ListEnvelope::Cards { cards: items }
            | ListEnvelope::Results { results: items } => items,
        }
    }
}

/// Decode a list response from `endpoint`.
///
/// Fails with [`PokePriceError::UnexpectedShape`] when the body matches no
/// envelope, or when it holds rows and none of them decode.
pub fn normalize_list<T: DeserializeOwned>(endpoint: &str, body: Value) -> Result<Vec<T>> {
    let rows = serde_json::from_value::<ListEnvelope<Value>>(body)
        .map_err(|e| {
            tracing::warn!(endpoint, error = %e, "Unrecognized list response shape");
            PokePriceError::UnexpectedShape {
                endpoint: endpoint.to_string(),
                detail: "no known list envelope".to_string(),
            }
        })?
        .into_vec();

    let total = rows.len();
    let items: Vec<T> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<T>(row) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(endpoint, index, error = %e, "Skipping undecodable row");
                None
            }
        })
        .collect();

    if total > 0 && items.is_empty() {
        return Err(PokePriceError::UnexpectedShape {
            endpoint: endpoint.to_string(),
            detail: format!("none of {total} rows decoded"),
        });
    }
    if items.len() < total {
        tracing::warn!(endpoint, kept = items.len(), total, "Dropped undecodable rows");
    }
    Ok(items)
}
