use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::card::ImageUrls;
use super::de;

// ---------------------------------------------------------------------------
// PriceQuote — One pricing source's figure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub value: Option<f64>,
    pub currency: Option<String>,
}

// ---------------------------------------------------------------------------
// CardPricing — PokeData `/pricing` payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPricing {
    #[serde(alias = "id")]
    pub card_id: i64,
    pub name: Option<String>,
    #[serde(default, alias = "set_name")]
    pub set_name: Option<String>,
    #[serde(default, alias = "num", deserialize_with = "de::opt_string_or_number")]
    pub card_number: Option<String>,
    /// Keyed by source, e.g. `"PSA 10.0"`, `"TCGPlayer"`, `"eBay Raw"`.
    #[serde(default)]
    pub pricing: BTreeMap<String, PriceQuote>,
}

impl CardPricing {
    /// Flatten to source -> amount, dropping sources without a value.
    pub fn amounts(&self) -> BTreeMap<String, f64> {
        self.pricing
            .iter()
            .filter_map(|(source, quote)| quote.value.map(|v| (source.clone(), v)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// PricingResult — Pricing plus cache provenance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    pub card_id: i64,
    pub set_id: i64,
    pub pricing: CardPricing,
    pub image_urls: Option<ImageUrls>,
    pub from_cache: bool,
    /// Seconds since the payload was written, when served from cache.
    pub cache_age_seconds: Option<i64>,
    pub is_stale: bool,
}
