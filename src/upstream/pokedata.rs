use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{check_status, normalize_list, PricingSource};
use crate::config;
use crate::error::Result;
use crate::models::{Card, CardPricing, UpstreamSet};

/// Client for the PokeData pricing API.
#[derive(Clone)]
pub struct PokeDataClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl PokeDataClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(config::POKEDATA_BASE, api_key, timeout)
    }

    pub fn with_base_url(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, ?query, "PokeData request");

        let mut req = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = check_status(req.send().await?).await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl PricingSource for PokeDataClient {
    async fn fetch_sets(&self) -> Result<Vec<UpstreamSet>> {
        let body = self.get_json("/sets", &[]).await?;
        normalize_list("pokedata /sets", body)
    }

    async fn fetch_cards(&self, set_id: i64) -> Result<Vec<Card>> {
        let body = self
            .get_json("/set", &[("set_id", set_id.to_string())])
            .await?;
        let mut cards: Vec<Card> = normalize_list("pokedata /set", body)?;
        for card in &mut cards {
            card.set_id.get_or_insert(set_id);
        }
        Ok(cards)
    }

    async fn fetch_pricing(&self, card_id: i64) -> Result<CardPricing> {
        let body = self
            .get_json(
                "/pricing",
                &[("id", card_id.to_string()), ("asset_type", "CARD".to_string())],
            )
            .await?;
        Ok(serde_json::from_value(body)?)
    }
}
