//! Pokemon card price lookup SDK.
//!
//! Combines the PokeData pricing API with the Pokemon TCG API. Set lists,
//! card lists and prices are cached with per-collection freshness rules and
//! served from cache, stale cache, or a bundled fallback when the upstream
//! is slow or down.
//!
//! # Quick start
//!
//! ```no_run
//! use pokeprice_sdk::PokePriceSdk;
//!
//! # async fn run() -> pokeprice_sdk::Result<()> {
//! let sdk = PokePriceSdk::builder().api_key("secret").build()?;
//!
//! let sets = sdk.sets().list(false).await?;
//! let cards = sdk.cards().for_set(sets[0].id).await?;
//! let price = sdk.prices().get(cards[0].id, sets[0].id).await?;
//! println!("{} stale={}", price.card_id, price.is_stale);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod connection;
pub mod current_sets;
pub mod error;
pub mod expansion;
pub mod fallback;
pub mod models;
pub mod queries;
pub mod reconcile;
pub mod service;
pub mod upstream;

pub use cache::{CacheEntry, CacheStore, Collection, FileCacheStore, TieredStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ServiceConfig;
pub use connection::DocumentStore;
pub use current_sets::CurrentSets;
pub use error::{PokePriceError, Result};
pub use expansion::{ClassifierRules, ExpansionClassifier};
pub use reconcile::ReconcileOptions;
pub use service::{DataService, ServiceEvent, ServiceStats};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use models::SetMappingTable;
use upstream::{CardImageSource, OfflineSource, PokeDataClient, PokemonTcgClient, PricingSource};

// ---------------------------------------------------------------------------
// PokePriceSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`PokePriceSdk`] instance.
///
/// Use [`PokePriceSdk::builder()`] or [`PokePriceSdkBuilder::from_env()`],
/// chain configuration methods, and call [`build()`](PokePriceSdkBuilder::build).
pub struct PokePriceSdkBuilder {
    cache_dir: Option<PathBuf>,
    offline: bool,
    timeout: Duration,
    api_key: Option<String>,
    tcg_api_key: Option<String>,
    pokedata_base_url: String,
    tcg_base_url: String,
    document_store: bool,
    document_store_path: Option<PathBuf>,
    mapping_file: Option<PathBuf>,
    fallback_file: Option<PathBuf>,
    config: ServiceConfig,
    reconcile: ReconcileOptions,
    classifier_rules: ClassifierRules,
}

impl Default for PokePriceSdkBuilder {
    fn default() -> Self {
        Self {
            cache_dir: None,
            offline: false,
            timeout: Duration::from_secs(30),
            api_key: None,
            tcg_api_key: None,
            pokedata_base_url: config::POKEDATA_BASE.to_string(),
            tcg_base_url: config::POKEMON_TCG_BASE.to_string(),
            document_store: false,
            document_store_path: None,
            mapping_file: None,
            fallback_file: None,
            config: ServiceConfig::default(),
            reconcile: ReconcileOptions::default(),
            classifier_rules: ClassifierRules::default(),
        }
    }
}

impl PokePriceSdkBuilder {
    /// Start from the environment: `POKEDATA_API_KEY`, `POKEMON_TCG_API_KEY`
    /// and `POKEPRICE_CACHE_DIR`. Unset or empty variables are ignored.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        let mut builder = Self::default();
        builder.api_key = var(config::ENV_POKEDATA_API_KEY);
        builder.tcg_api_key = var(config::ENV_POKEMON_TCG_API_KEY);
        builder.cache_dir = var(config::ENV_CACHE_DIR).map(PathBuf::from);
        builder
    }

    /// Set a custom cache directory.
    ///
    /// If not set, the platform-appropriate default cache directory is used
    /// (e.g. `~/.cache/pokeprice-sdk` on Linux).
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable offline mode.
    ///
    /// When offline, no upstream request is made: cached data and the
    /// fallback set list are all that is served. Defaults to `false`.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Set the HTTP request timeout for upstream calls.
    ///
    /// Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// PokeData bearer token.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Pokemon TCG API key. The API works without one at a lower rate limit.
    pub fn tcg_api_key(mut self, key: impl Into<String>) -> Self {
        self.tcg_api_key = Some(key.into());
        self
    }

    pub fn pokedata_base_url(mut self, url: impl Into<String>) -> Self {
        self.pokedata_base_url = url.into();
        self
    }

    pub fn tcg_base_url(mut self, url: impl Into<String>) -> Self {
        self.tcg_base_url = url.into();
        self
    }

    /// Put a DuckDB document store behind the file cache.
    ///
    /// The database lives at `documents.duckdb` in the cache directory
    /// unless [`document_store_path`](Self::document_store_path) says otherwise.
    pub fn document_store(mut self, enabled: bool) -> Self {
        self.document_store = enabled;
        self
    }

    /// Location of the DuckDB document store. Implies `document_store(true)`.
    pub fn document_store_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.document_store = true;
        self.document_store_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Where the reconciled set mapping is read from and saved to.
    ///
    /// Defaults to `set_mapping.json` in the cache directory.
    pub fn mapping_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.mapping_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replace the bundled fallback set list with a `.json` or `.json.gz` file.
    pub fn fallback_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.fallback_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn service_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn reconcile_options(mut self, options: ReconcileOptions) -> Self {
        self.reconcile = options;
        self
    }

    pub fn classifier_rules(mut self, rules: ClassifierRules) -> Self {
        self.classifier_rules = rules;
        self
    }

    /// Build the SDK: open the cache stores and load persisted mapping and
    /// current-set state. No upstream request is made here.
    pub fn build(self) -> Result<PokePriceSdk> {
        let cache_dir = self.cache_dir.unwrap_or_else(config::default_cache_dir);

        let file_store: Arc<dyn CacheStore> = Arc::new(FileCacheStore::new(&cache_dir)?);
        let store: Arc<dyn CacheStore> = if self.document_store {
            let path = self
                .document_store_path
                .unwrap_or_else(|| cache_dir.join(config::DOCUMENT_STORE_FILE));
            let far: Arc<dyn CacheStore> = Arc::new(DocumentStore::open(&path)?);
            Arc::new(TieredStore::new(file_store, far))
        } else {
            file_store
        };

        let (pricing, images): (Arc<dyn PricingSource>, Option<Arc<dyn CardImageSource>>) =
            if self.offline {
                (Arc::new(OfflineSource), None)
            } else {
                (
                    Arc::new(PokeDataClient::with_base_url(
                        &self.pokedata_base_url,
                        self.api_key,
                        self.timeout,
                    )?),
                    Some(Arc::new(PokemonTcgClient::with_base_url(
                        &self.tcg_base_url,
                        self.tcg_api_key,
                        self.timeout,
                    )?)),
                )
            };

        let mapping_file = self
            .mapping_file
            .unwrap_or_else(|| cache_dir.join(config::SET_MAPPING_FILE));
        let mapping = load_or_default(&mapping_file, SetMappingTable::load);

        let current_sets_file = cache_dir.join(config::CURRENT_SETS_FILE);
        let current = load_or_default(&current_sets_file, CurrentSets::load);

        let mut service = DataService::builder(pricing.clone(), store)
            .config(self.config)
            .classifier(ExpansionClassifier::new(self.classifier_rules))
            .mapping(mapping)
            .current_sets(current)
            .current_sets_file(current_sets_file);
        if let Some(images) = &images {
            service = service.images(images.clone());
        }
        if let Some(path) = &self.fallback_file {
            service = service.fallback_sets(fallback::load_sets(path)?);
        }

        Ok(PokePriceSdk {
            cache_dir,
            mapping_file,
            offline: self.offline,
            reconcile: self.reconcile,
            pricing,
            images,
            service: service.build(),
        })
    }
}

/// Load a persisted file, falling back to the default when it is missing or unreadable.
fn load_or_default<T: Default>(path: &Path, load: impl FnOnce(&Path) -> Result<T>) -> T {
    if !path.exists() {
        return T::default();
    }
    match load(path) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable state file");
            T::default()
        }
    }
}

// ---------------------------------------------------------------------------
// PokePriceSdk
// ---------------------------------------------------------------------------

/// The main entry point for the SDK.
///
/// Wraps a [`DataService`] (which owns the cache store and upstream clients)
/// and exposes the set, card and price queries as lightweight borrowing wrappers.
///
/// Created via [`PokePriceSdk::builder()`].
pub struct PokePriceSdk {
    cache_dir: PathBuf,
    mapping_file: PathBuf,
    offline: bool,
    reconcile: ReconcileOptions,
    pricing: Arc<dyn PricingSource>,
    images: Option<Arc<dyn CardImageSource>>,
    service: DataService,
}

impl PokePriceSdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> PokePriceSdkBuilder {
        PokePriceSdkBuilder::default()
    }

    // -- Query accessors ---------------------------------------------------

    /// Access the set list query interface.
    pub fn sets(&self) -> queries::SetQuery<'_> {
        self.service.sets()
    }

    /// Access the cards-for-set query interface.
    pub fn cards(&self) -> queries::CardQuery<'_> {
        self.service.cards()
    }

    /// Access the card pricing query interface.
    pub fn prices(&self) -> queries::PriceQuery<'_> {
        self.service.prices()
    }

    /// The underlying service. Clone it to share with spawned tasks.
    pub fn service(&self) -> &DataService {
        &self.service
    }

    // -- Maintenance -------------------------------------------------------

    /// Rebuild the TCG <-> PokeData set mapping from both live set lists.
    ///
    /// The new table is saved to the mapping file and used for image lookups
    /// from now on.
    pub async fn reconcile_sets(&self) -> Result<SetMappingTable> {
        let images = self
            .images
            .as_ref()
            .ok_or_else(|| PokePriceError::NotFound("card image source (offline)".into()))?;

        let (tcg_sets, pokedata_sets) =
            tokio::try_join!(images.fetch_sets(), self.pricing.fetch_sets())?;
        let table = reconcile::reconcile(&tcg_sets, &pokedata_sets, &self.reconcile);
        tracing::info!(
            mapped = table.len(),
            unmapped = table.unmapped.len(),
            "Reconciled set lists"
        );

        let (path, saved) = (self.mapping_file.clone(), table.clone());
        tokio::task::spawn_blocking(move || saved.save(&path)).await??;
        self.service.replace_mapping(table.clone());
        Ok(table)
    }

    /// Remove every cached document.
    pub async fn clear_cache(&self) -> Result<()> {
        self.service.clear_cache().await
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for PokePriceSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PokePriceSdk(cache_dir={}, store={}, mapped_sets={}, offline={})",
            self.cache_dir.display(),
            self.service.store().name(),
            self.service.mapping().len(),
            self.offline
        )
    }
}
