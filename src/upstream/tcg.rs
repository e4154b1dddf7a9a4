use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{check_status, normalize_list, CardImageSource};
use crate::config;
use crate::error::Result;
use crate::models::{TcgCard, TcgSet};

const PAGE_SIZE: usize = 250;

/// Client for the Pokemon TCG API (card images and PTCGO codes).
#[derive(Clone)]
pub struct PokemonTcgClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl PokemonTcgClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(config::POKEMON_TCG_BASE, api_key, timeout)
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
        tracing::debug!(%url, ?query, "Pokemon TCG request");

        let mut req = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            req = req.header("X-Api-Key", key);
        }
        let resp = check_status(req.send().await?).await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl CardImageSource for PokemonTcgClient {
    async fn fetch_sets(&self) -> Result<Vec<TcgSet>> {
        let body = self
            .get_json("/sets", &[("pageSize", PAGE_SIZE.to_string())])
            .await?;
        normalize_list("tcg /sets", body)
    }

    /// Fetch every card of a set, following pagination until `totalCount` is reached.
    async fn fetch_cards(&self, set_id: &str) -> Result<Vec<TcgCard>> {
        let mut all = Vec::new();
        let mut page = 1usize;
        loop {
            let body = self
                .get_json(
                    "/cards",
                    &[
                        ("q", format!("set.id:{set_id}")),
                        ("page", page.to_string()),
                        ("pageSize", PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let total = body
                .get("totalCount")
                .and_then(|v| v.as_u64())
                .map(|n| n as usize);
            let batch: Vec<TcgCard> = normalize_list("tcg /cards", body)?;
            let got = batch.len();
            all.extend(batch);

            match total {
                Some(total) if all.len() < total && got > 0 => page += 1,
                _ => break,
            }
        }
        tracing::debug!(set_id, count = all.len(), "Fetched TCG cards");
        Ok(all)
    }
}
