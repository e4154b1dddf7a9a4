//! Cache-or-fetch orchestration over the upstream APIs.
//!
//! [`DataService`] is cheap to clone; clones share caches, locks and event
//! channels. The three operations callers rely on are
//! [`get_set_list`](DataService::get_set_list),
//! [`get_cards_for_set`](DataService::get_cards_for_set) and
//! [`get_card_pricing`](DataService::get_card_pricing). Their policies live
//! in the matching modules under [`crate::queries`].

pub mod events;
pub(crate) mod singleflight;

pub use events::{ServiceEvent, ServiceStats};

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::cache::{CacheEntry, CacheStore, Collection};
use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::current_sets::CurrentSets;
use crate::error::{PokePriceError, Result};
use crate::expansion::ExpansionClassifier;
use crate::fallback;
use crate::models::{Card, CardPricing, ExpansionGroup, PokemonSet, PricingResult, SetMappingTable, UpstreamSet};
use crate::queries::{cards::CardQuery, prices::PriceQuery, sets::SetQuery};
use crate::upstream::{CardImageSource, PricingSource};
use events::EventHub;
use singleflight::KeyedLocks;

// ---------------------------------------------------------------------------
// DataServiceBuilder
// ---------------------------------------------------------------------------

/// Builder for a [`DataService`]. Only the pricing source and the cache store are required.
pub struct DataServiceBuilder {
    pricing: Arc<dyn PricingSource>,
    store: Arc<dyn CacheStore>,
    images: Option<Arc<dyn CardImageSource>>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
    classifier: ExpansionClassifier,
    mapping: SetMappingTable,
    current_sets: CurrentSets,
    current_sets_file: Option<PathBuf>,
    fallback_sets: Option<Vec<UpstreamSet>>,
}

impl DataServiceBuilder {
    /// Card-image source used to attach image URLs to card lists.
    pub fn images(mut self, images: Arc<dyn CardImageSource>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn classifier(mut self, classifier: ExpansionClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Reconciled TCG <-> PokeData set mapping, used for image enrichment.
    pub fn mapping(mut self, mapping: SetMappingTable) -> Self {
        self.mapping = mapping;
        self
    }

    /// Initial current-sets snapshot.
    pub fn current_sets(mut self, current: CurrentSets) -> Self {
        self.current_sets = current;
        self
    }

    /// Where new current-sets snapshots are persisted.
    pub fn current_sets_file(mut self, path: PathBuf) -> Self {
        self.current_sets_file = Some(path);
        self
    }

    /// Replace the bundled fallback set list.
    pub fn fallback_sets(mut self, sets: Vec<UpstreamSet>) -> Self {
        self.fallback_sets = Some(sets);
        self
    }

    pub fn build(self) -> DataService {
        DataService {
            inner: Arc::new(ServiceInner {
                pricing: self.pricing,
                images: self.images,
                store: self.store,
                clock: self.clock,
                config: self.config,
                classifier: self.classifier,
                mapping: RwLock::new(Arc::new(self.mapping)),
                current_sets: RwLock::new(Arc::new(self.current_sets)),
                current_sets_file: self.current_sets_file,
                fallback_sets: self.fallback_sets.unwrap_or_else(fallback::bundled_sets),
                locks: KeyedLocks::default(),
                events: EventHub::new(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// DataService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct DataService {
    pub(crate) inner: Arc<ServiceInner>,
}

pub(crate) struct ServiceInner {
    pub(crate) pricing: Arc<dyn PricingSource>,
    pub(crate) images: Option<Arc<dyn CardImageSource>>,
    pub(crate) store: Arc<dyn CacheStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: ServiceConfig,
    pub(crate) classifier: ExpansionClassifier,
    mapping: RwLock<Arc<SetMappingTable>>,
    current_sets: RwLock<Arc<CurrentSets>>,
    current_sets_file: Option<PathBuf>,
    pub(crate) fallback_sets: Vec<UpstreamSet>,
    pub(crate) locks: KeyedLocks,
    pub(crate) events: EventHub,
}

impl DataService {
    pub fn builder(pricing: Arc<dyn PricingSource>, store: Arc<dyn CacheStore>) -> DataServiceBuilder {
        DataServiceBuilder {
            pricing,
            store,
            images: None,
            clock: Arc::new(SystemClock),
            config: ServiceConfig::default(),
            classifier: ExpansionClassifier::default(),
            mapping: SetMappingTable::default(),
            current_sets: CurrentSets::default(),
            current_sets_file: None,
            fallback_sets: None,
        }
    }

    // -- Query accessors ---------------------------------------------------

    pub fn sets(&self) -> SetQuery<'_> {
        SetQuery::new(self)
    }

    pub fn cards(&self) -> CardQuery<'_> {
        CardQuery::new(self)
    }

    pub fn prices(&self) -> PriceQuery<'_> {
        PriceQuery::new(self)
    }

    // -- Operations --------------------------------------------------------

    /// All sets, newest first, each with a unique id.
    pub async fn get_set_list(&self, force_refresh: bool) -> Result<Vec<PokemonSet>> {
        self.sets().list(force_refresh).await
    }

    pub async fn get_cards_for_set(&self, set_id: i64) -> Result<Vec<Card>> {
        self.cards().for_set(set_id).await
    }

    pub async fn get_card_pricing(&self, card_id: i64, set_id: i64) -> Result<PricingResult> {
        self.prices().get(card_id, set_id).await
    }

    /// The set list grouped by expansion.
    pub async fn get_grouped_sets(&self, force_refresh: bool) -> Result<Vec<ExpansionGroup>> {
        let sets = self.get_set_list(force_refresh).await?;
        Ok(self.inner.classifier.group(&sets))
    }

    // -- State -------------------------------------------------------------

    pub fn current_sets(&self) -> Arc<CurrentSets> {
        self.inner
            .current_sets
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Swap in a new current-sets snapshot and persist it when a file is configured.
    pub async fn replace_current_sets(&self, next: CurrentSets) -> Arc<CurrentSets> {
        let next = Arc::new(next);
        if let Some(path) = self.inner.current_sets_file.clone() {
            let snapshot = next.clone();
            let target = path.clone();
            let saved = tokio::task::spawn_blocking(move || snapshot.save(&target))
                .await
                .map_err(PokePriceError::from)
                .and_then(|r| r);
            if let Err(e) = saved {
                tracing::warn!(path = %path.display(), error = %e, "Failed to persist current sets");
            }
        }
        *self
            .inner
            .current_sets
            .write()
            .unwrap_or_else(|e| e.into_inner()) = next.clone();
        next
    }

    pub fn mapping(&self) -> Arc<SetMappingTable> {
        self.inner
            .mapping
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn replace_mapping(&self, mapping: SetMappingTable) {
        *self
            .inner
            .mapping
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Arc::new(mapping);
    }

    pub fn classifier(&self) -> &ExpansionClassifier {
        &self.inner.classifier
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.inner.store
    }

    /// Receive refresh and degradation events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.inner.events.subscribe()
    }

    pub fn stats(&self) -> ServiceStats {
        self.inner.events.stats()
    }

    // -- Cache helpers -----------------------------------------------------

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    pub(crate) fn emit(&self, event: ServiceEvent) {
        self.inner.events.emit(event);
    }

    /// Run a store operation on the blocking pool, off the async workers.
    async fn with_store<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&dyn CacheStore) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let store = self.inner.store.clone();
        tokio::task::spawn_blocking(move || op(store.as_ref())).await?
    }

    /// Read and decode an entry. Store failures and undecodable payloads are
    /// logged and reported as a miss.
    pub(crate) async fn read_cached<T: DeserializeOwned>(
        &self,
        collection: Collection,
        key: &str,
    ) -> Option<(T, CacheEntry)> {
        let owned = key.to_string();
        let entry = match self.with_store(move |store| store.get(collection, &owned)).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(store = self.inner.store.name(), collection = collection.as_str(), key, error = %e, "Cache read failed");
                return None;
            }
        };
        match serde_json::from_value::<T>(entry.payload.clone()) {
            Ok(value) => Some((value, entry)),
            Err(e) => {
                tracing::warn!(collection = collection.as_str(), key, error = %e, "Cached payload has an unexpected shape");
                None
            }
        }
    }

    /// Write `value` stamped with the service clock. Failures are logged only.
    pub(crate) async fn write_cached<T: Serialize>(&self, collection: Collection, key: &str, value: &T) {
        let written_at = self.now();
        let result = match serde_json::to_value(value) {
            Ok(payload) => {
                let owned = key.to_string();
                self.with_store(move |store| store.put_at(collection, &owned, &payload, written_at))
                    .await
            }
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!(store = self.inner.store.name(), collection = collection.as_str(), key, error = %e, "Cache write failed");
        }
    }

    /// The TCG set id linked to a PokeData set, if reconciliation found one.
    pub(crate) fn external_set_for(&self, set_id: i64, set_code: Option<&str>) -> Option<String> {
        self.mapping()
            .external_for(set_id, set_code)
            .map(|m| m.external_set_id.clone())
    }

    /// Remove every cached document.
    pub async fn clear_cache(&self) -> Result<()> {
        self.with_store(|store| store.clear()).await
    }

    /// Pricing for `card_id` straight from the cache, ignoring age.
    pub async fn cached_pricing(&self, card_id: i64) -> Option<CardPricing> {
        self.read_cached(Collection::CardPricing, &card_id.to_string())
            .await
            .map(|(p, _)| p)
    }
}
