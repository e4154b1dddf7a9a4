use std::path::PathBuf;
use std::time::Duration;

pub const POKEDATA_BASE: &str = "https://www.pokedata.io/v0";
pub const POKEMON_TCG_BASE: &str = "https://api.pokemontcg.io/v2";

/// Environment variables read by [`crate::PokePriceSdkBuilder::from_env`].
pub const ENV_POKEDATA_API_KEY: &str = "POKEDATA_API_KEY";
pub const ENV_POKEMON_TCG_API_KEY: &str = "POKEMON_TCG_API_KEY";
pub const ENV_CACHE_DIR: &str = "POKEPRICE_CACHE_DIR";

/// File names inside the cache directory.
pub const SET_MAPPING_FILE: &str = "set_mapping.json";
pub const CURRENT_SETS_FILE: &str = "current_sets.json";
pub const DOCUMENT_STORE_FILE: &str = "documents.duckdb";

pub const DEFAULT_LANGUAGE: &str = "ENGLISH";

const HOUR: u64 = 60 * 60;

/// Tunables for the [`crate::service::DataService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Age after which the cached set list is refreshed in the background.
    pub set_list_ttl: Duration,
    /// Hard TTL for cached card pricing.
    pub pricing_ttl: Duration,
    /// Age after which the card list of a "current" set is re-fetched.
    pub current_set_revalidate: Duration,
    /// How long the cold-cache set list load may take before the fallback list is served.
    pub initial_load_timeout: Duration,
    /// Sets released within this many days count as current.
    pub current_set_window_days: i64,
    /// Only sets in this language are returned. `None` keeps every language.
    pub language: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            set_list_ttl: Duration::from_secs(24 * HOUR),
            pricing_ttl: Duration::from_secs(24 * HOUR),
            current_set_revalidate: Duration::from_secs(24 * HOUR),
            initial_load_timeout: Duration::from_secs(5),
            current_set_window_days: 120,
            language: Some(DEFAULT_LANGUAGE.to_string()),
        }
    }
}

pub fn default_cache_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("pokeprice-sdk")
    } else {
        PathBuf::from(".pokeprice-sdk-cache")
    }
}
