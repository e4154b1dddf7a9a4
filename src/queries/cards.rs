//! Cards for a set, cached without expiry.
//!
//! Released sets do not change, so a cached card list is served forever.
//! Sets in the current-sets snapshot are the exception: their lists are
//! revalidated once older than the configured interval.

use std::collections::HashMap;

use crate::cache::Collection;
use crate::error::{PokePriceError, Result};
use crate::models::{card_number_key, Card, ImageUrls, PokemonSet, TcgCard};
use crate::queries::sets::SET_LIST_KEY;
use crate::service::{DataService, ServiceEvent};

// ---------------------------------------------------------------------------
// CardQuery
// ---------------------------------------------------------------------------

pub struct CardQuery<'a> {
    svc: &'a DataService,
}

impl<'a> CardQuery<'a> {
    pub fn new(svc: &'a DataService) -> Self {
        Self { svc }
    }

    /// Cards in the set with PokeData id `set_id`.
    ///
    /// Upstream failures are not returned: the cached list is served when
    /// there is one, otherwise an empty list.
    pub async fn for_set(&self, set_id: i64) -> Result<Vec<Card>> {
        if set_id <= 0 {
            return Err(PokePriceError::InvalidArgument(format!(
                "set_id must be positive, got {set_id}"
            )));
        }

        let svc = self.svc;
        let key = set_id.to_string();
        let cached = svc.read_cached::<Vec<Card>>(Collection::CardsForSet, &key).await;

        if let Some((cards, entry)) = &cached {
            let revalidate = svc.current_sets().contains(set_id)
                && entry.is_stale(svc.config().current_set_revalidate, svc.now());
            if !revalidate {
                return Ok(cards.clone());
            }
            tracing::debug!(set_id, "Revalidating cards for current set");
        }

        match refresh(svc, set_id).await {
            Ok(cards) => Ok(cards),
            Err(e) => {
                let event_key = format!("{}:{key}", Collection::CardsForSet.as_str());
                match cached {
                    Some((cards, _)) => {
                        tracing::warn!(set_id, error = %e, "Card revalidation failed, serving cached list");
                        svc.emit(ServiceEvent::StaleServed { key: event_key });
                        Ok(cards)
                    }
                    None => {
                        tracing::warn!(set_id, error = %e, "Card fetch failed with nothing cached");
                        svc.emit(ServiceEvent::FallbackServed {
                            key: event_key,
                            reason: e.to_string(),
                        });
                        Ok(Vec::new())
                    }
                }
            }
        }
    }

    /// The cached list for `set_id`, whatever its age.
    pub async fn cached(&self, set_id: i64) -> Option<Vec<Card>> {
        self.svc
            .read_cached(Collection::CardsForSet, &set_id.to_string())
            .await
            .map(|(cards, _)| cards)
    }
}

async fn refresh(svc: &DataService, set_id: i64) -> Result<Vec<Card>> {
    let key = set_id.to_string();
    let flight = svc
        .inner
        .locks
        .begin(&format!("{}:{key}", Collection::CardsForSet.as_str()))
        .await;
    if flight.joined() {
        if let Some((cards, _)) = svc.read_cached::<Vec<Card>>(Collection::CardsForSet, &key).await {
            return Ok(cards);
        }
    }

    let mut cards = svc.inner.pricing.fetch_cards(set_id).await?;
    for card in &mut cards {
        card.set_id.get_or_insert(set_id);
    }
    enrich_images(svc, set_id, &mut cards).await;
    tracing::info!(set_id, count = cards.len(), "Fetched cards");

    svc.write_cached(Collection::CardsForSet, &key, &cards).await;
    flight.complete();
    Ok(cards)
}

/// Attach TCG image URLs through the reconciled set mapping. Best effort.
async fn enrich_images(svc: &DataService, set_id: i64, cards: &mut [Card]) {
    let Some(images) = &svc.inner.images else {
        return;
    };
    let code = cached_set_code(svc, set_id).await.or_else(|| cards.iter().find_map(|c| c.set_code.clone()));
    let Some(external) = svc.external_set_for(set_id, code.as_deref()) else {
        tracing::debug!(set_id, "No TCG mapping for set, skipping images");
        return;
    };
    match images.fetch_cards(&external).await {
        Ok(tcg_cards) => {
            let attached = attach_images(cards, &tcg_cards);
            tracing::debug!(set_id, external = %external, attached, "Attached card images");
        }
        Err(e) => {
            tracing::warn!(set_id, external = %external, error = %e, "Card image lookup failed");
        }
    }
}

async fn cached_set_code(svc: &DataService, set_id: i64) -> Option<String> {
    let (sets, _) = svc
        .read_cached::<Vec<PokemonSet>>(Collection::SetList, SET_LIST_KEY)
        .await?;
    sets.into_iter().find(|s| s.id == set_id)?.code
}

/// Copy image URLs onto cards that lack them, matching by card number.
///
/// Numbers compare without leading zeros and case-insensitively, so `"004"`
/// matches `"4"`. Returns how many cards received images.
pub fn attach_images(cards: &mut [Card], tcg_cards: &[TcgCard]) -> usize {
    let by_number: HashMap<String, &ImageUrls> = tcg_cards
        .iter()
        .filter_map(|c| c.images.as_ref().map(|img| (card_number_key(&c.number), img)))
        .collect();

    let mut attached = 0;
    for card in cards.iter_mut().filter(|c| c.image_urls.is_none()) {
        if let Some(images) = by_number.get(&card_number_key(&card.card_number)) {
            card.image_urls = Some((*images).clone());
            attached += 1;
        }
    }
    attached
}
