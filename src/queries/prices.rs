//! Card pricing with a hard TTL and stale-on-failure.
//!
//! A fresh cached entry is returned as is. An expired entry forces a
//! synchronous refetch; if that fails the expired entry is returned with
//! `is_stale` set instead of an error.

use crate::cache::{CacheEntry, Collection};
use crate::error::{PokePriceError, Result};
use crate::models::{Card, CardPricing, ImageUrls, PricingResult};
use crate::service::{DataService, ServiceEvent};

// ---------------------------------------------------------------------------
// PriceQuery
// ---------------------------------------------------------------------------

pub struct PriceQuery<'a> {
    svc: &'a DataService,
}

impl<'a> PriceQuery<'a> {
    pub fn new(svc: &'a DataService) -> Self {
        Self { svc }
    }

    /// Pricing for `card_id`, with image URLs from the cached cards of `set_id`.
    ///
    /// Fails only when the upstream fails and nothing is cached.
    pub async fn get(&self, card_id: i64, set_id: i64) -> Result<PricingResult> {
        if card_id <= 0 {
            return Err(PokePriceError::InvalidArgument(format!(
                "card_id must be positive, got {card_id}"
            )));
        }
        if set_id <= 0 {
            return Err(PokePriceError::InvalidArgument(format!(
                "set_id must be positive, got {set_id}"
            )));
        }

        let svc = self.svc;
        let key = card_id.to_string();
        let ttl = svc.config().pricing_ttl;
        let cached = svc.read_cached::<CardPricing>(Collection::CardPricing, &key).await;

        if let Some((pricing, entry)) = &cached {
            if !entry.is_stale(ttl, svc.now()) {
                return Ok(self.from_cache(card_id, set_id, pricing.clone(), entry, false).await);
            }
        }

        let flight = svc
            .inner
            .locks
            .begin(&format!("{}:{key}", Collection::CardPricing.as_str()))
            .await;
        if flight.joined() {
            if let Some((pricing, entry)) = svc.read_cached::<CardPricing>(Collection::CardPricing, &key).await {
                if !entry.is_stale(ttl, svc.now()) {
                    return Ok(self.from_cache(card_id, set_id, pricing, &entry, false).await);
                }
            }
        }

        match svc.inner.pricing.fetch_pricing(card_id).await {
            Ok(pricing) => {
                svc.write_cached(Collection::CardPricing, &key, &pricing).await;
                flight.complete();
                tracing::debug!(card_id, sources = pricing.pricing.len(), "Fetched pricing");
                Ok(PricingResult {
                    card_id,
                    set_id,
                    image_urls: self.image_urls(card_id, set_id).await,
                    pricing,
                    from_cache: false,
                    cache_age_seconds: None,
                    is_stale: false,
                })
            }
            Err(e) => match cached {
                Some((pricing, entry)) => {
                    tracing::warn!(card_id, error = %e, "Pricing refresh failed, serving stale entry");
                    svc.emit(ServiceEvent::StaleServed {
                        key: format!("{}:{key}", Collection::CardPricing.as_str()),
                    });
                    Ok(self.from_cache(card_id, set_id, pricing, &entry, true).await)
                }
                None => Err(e),
            },
        }
    }

    async fn from_cache(
        &self,
        card_id: i64,
        set_id: i64,
        pricing: CardPricing,
        entry: &CacheEntry,
        is_stale: bool,
    ) -> PricingResult {
        let age = entry.age(self.svc.now());
        PricingResult {
            card_id,
            set_id,
            image_urls: self.image_urls(card_id, set_id).await,
            pricing,
            from_cache: true,
            cache_age_seconds: Some(i64::try_from(age.as_secs()).unwrap_or(i64::MAX)),
            is_stale,
        }
    }

    async fn image_urls(&self, card_id: i64, set_id: i64) -> Option<ImageUrls> {
        let (cards, _) = self
            .svc
            .read_cached::<Vec<Card>>(Collection::CardsForSet, &set_id.to_string())
            .await?;
        cards.into_iter().find(|c| c.id == card_id)?.image_urls
    }
}
