//! TTL-stamped document caches for set lists, card lists and card pricing.
//!
//! Every entry carries the time it was written; freshness is judged by the
//! reader against a per-collection TTL, so stores never expire anything on
//! their own. Two tiers exist: [`FileCacheStore`] keeps documents on local
//! disk, [`crate::connection::DocumentStore`] keeps them in a DuckDB table,
//! and [`TieredStore`] layers one over the other.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Namespace of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    SetList,
    CardsForSet,
    CardPricing,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::SetList,
        Collection::CardsForSet,
        Collection::CardPricing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::SetList => "sets",
            Collection::CardsForSet => "cards",
            Collection::CardPricing => "pricing",
        }
    }
}

// ---------------------------------------------------------------------------
// CacheEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub payload: Value,
    pub written_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Age of the entry at `now`. Entries written in the future have age zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.written_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_stale(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        is_stale(self.written_at, ttl, now)
    }
}

/// True iff `now - written_at > ttl`. An entry exactly `ttl` old is still fresh.
pub fn is_stale(written_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => now - written_at > ttl,
        // A TTL too large for chrono never expires.
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// CacheStore
// ---------------------------------------------------------------------------

/// Key-value document store with write timestamps.
///
/// Operations are synchronous; both backends are local and fast.
pub trait CacheStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    fn get(&self, collection: Collection, key: &str) -> Result<Option<CacheEntry>>;

    /// Store `payload`, overwriting any previous entry, stamped with `written_at`.
    fn put_at(
        &self,
        collection: Collection,
        key: &str,
        payload: &Value,
        written_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Store `payload` stamped with the current time.
    fn put(&self, collection: Collection, key: &str, payload: &Value) -> Result<()> {
        self.put_at(collection, key, payload, Utc::now())
    }

    /// Remove one entry. Returns whether it existed.
    fn remove(&self, collection: Collection, key: &str) -> Result<bool>;

    /// Remove every entry in every collection.
    fn clear(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// FileCacheStore
// ---------------------------------------------------------------------------

/// Stores each entry as a JSON document under `<dir>/<collection>/<key>.json`.
pub struct FileCacheStore {
    /// Directory where cached documents are stored.
    pub cache_dir: PathBuf,
}

impl FileCacheStore {
    /// Create a store rooted at `cache_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        let dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { cache_dir: dir })
    }

    fn path_for(&self, collection: Collection, key: &str) -> PathBuf {
        self.cache_dir
            .join(collection.as_str())
            .join(format!("{}.json", sanitize_key(key)))
    }
}

/// Map a cache key to a safe file stem.
///
/// ASCII letters, digits, `-` and `.` pass through; every other byte becomes
/// `_XX` (uppercase hex), so distinct keys never share a file.
fn sanitize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'.' {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("_{b:02X}"));
        }
    }
    out
}

impl CacheStore for FileCacheStore {
    fn name(&self) -> &'static str {
        "file"
    }

    /// A document that fails to parse is deleted and reported as a miss, so
    /// the next write starts clean.
    fn get(&self, collection: Collection, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.path_for(collection, key);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<CacheEntry>(&contents) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrupt cache document, removing"
                );
                let _ = fs::remove_file(&path);
                Ok(None)
            }
        }
    }

    /// Writes to a temp file first and renames on success, so an interrupted
    /// write never leaves a partial document behind.
    fn put_at(
        &self,
        collection: Collection,
        key: &str,
        payload: &Value,
        written_at: DateTime<Utc>,
    ) -> Result<()> {
        let path = self.path_for(collection, key);
        let dir = path.parent().unwrap_or(&self.cache_dir);
        fs::create_dir_all(dir)?;

        let entry = CacheEntry {
            key: key.to_string(),
            payload: payload.clone(),
            written_at,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, &entry)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, collection: Collection, key: &str) -> Result<bool> {
        match fs::remove_file(self.path_for(collection, key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<()> {
        for collection in Collection::ALL {
            let dir = self.cache_dir.join(collection.as_str());
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TieredStore
// ---------------------------------------------------------------------------

/// A near store in front of a far one.
///
/// Reads try `near` first; a far hit is copied into `near` with its original
/// timestamp. Writes go to both. A failing near store is logged and skipped.
pub struct TieredStore {
    near: Arc<dyn CacheStore>,
    far: Arc<dyn CacheStore>,
}

impl TieredStore {
    pub fn new(near: Arc<dyn CacheStore>, far: Arc<dyn CacheStore>) -> Self {
        Self { near, far }
    }
}

impl CacheStore for TieredStore {
    fn name(&self) -> &'static str {
        "tiered"
    }

    fn get(&self, collection: Collection, key: &str) -> Result<Option<CacheEntry>> {
        match self.near.get(collection, key) {
            Ok(Some(entry)) => return Ok(Some(entry)),
            Ok(None) => {}
            Err(e) => tracing::warn!(
                store = self.near.name(),
                key,
                error = %e,
                "Near cache read failed"
            ),
        }

        let Some(entry) = self.far.get(collection, key)? else {
            return Ok(None);
        };
        if let Err(e) = self
            .near
            .put_at(collection, key, &entry.payload, entry.written_at)
        {
            tracing::warn!(store = self.near.name(), key, error = %e, "Near cache back-fill failed");
        }
        Ok(Some(entry))
    }

    fn put_at(
        &self,
        collection: Collection,
        key: &str,
        payload: &Value,
        written_at: DateTime<Utc>,
    ) -> Result<()> {
        self.far.put_at(collection, key, payload, written_at)?;
        if let Err(e) = self.near.put_at(collection, key, payload, written_at) {
            tracing::warn!(store = self.near.name(), key, error = %e, "Near cache write failed");
        }
        Ok(())
    }

    fn remove(&self, collection: Collection, key: &str) -> Result<bool> {
        let near = self.near.remove(collection, key)?;
        let far = self.far.remove(collection, key)?;
        Ok(near || far)
    }

    fn clear(&self) -> Result<()> {
        self.near.clear()?;
        self.far.clear()
    }
}
