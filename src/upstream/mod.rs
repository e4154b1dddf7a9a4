//! HTTP clients for the two upstream APIs.
//!
//! [`PricingSource`] is PokeData (sets, cards and prices keyed by PokeData's
//! integer ids). [`CardImageSource`] is the Pokemon TCG API (sets and card
//! images keyed by string ids such as `sv8pt5`). Both are traits so the
//! service can run against fakes.

pub mod envelope;
pub mod pokedata;
pub mod tcg;

pub use envelope::{normalize_list, ListEnvelope};
pub use pokedata::PokeDataClient;
pub use tcg::PokemonTcgClient;

use async_trait::async_trait;

use crate::error::{PokePriceError, Result};
use crate::models::{Card, CardPricing, TcgCard, TcgSet, UpstreamSet};

#[async_trait]
pub trait PricingSource: Send + Sync {
    async fn fetch_sets(&self) -> Result<Vec<UpstreamSet>>;
    async fn fetch_cards(&self, set_id: i64) -> Result<Vec<Card>>;
    async fn fetch_pricing(&self, card_id: i64) -> Result<CardPricing>;
}

#[async_trait]
pub trait CardImageSource: Send + Sync {
    async fn fetch_sets(&self) -> Result<Vec<TcgSet>>;
    async fn fetch_cards(&self, set_id: &str) -> Result<Vec<TcgCard>>;
}

/// Turn a non-2xx response into [`PokePriceError::Upstream`], keeping the body text.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().to_string();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    Err(PokePriceError::Upstream {
        status: status.as_u16(),
        url,
        body,
    })
}

/// Pricing source used in offline mode: every request fails with
/// [`PokePriceError::NotFound`], so the service serves cached or fallback data only.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

#[async_trait]
impl PricingSource for OfflineSource {
    async fn fetch_sets(&self) -> Result<Vec<UpstreamSet>> {
        Err(PokePriceError::NotFound("set list (offline)".into()))
    }

    async fn fetch_cards(&self, set_id: i64) -> Result<Vec<Card>> {
        Err(PokePriceError::NotFound(format!("cards for set {set_id} (offline)")))
    }

    async fn fetch_pricing(&self, card_id: i64) -> Result<CardPricing> {
        Err(PokePriceError::NotFound(format!("pricing for card {card_id} (offline)")))
    }
}
