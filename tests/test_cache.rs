//! Cache store integration tests: file store, DuckDB document store, tiering.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::t0;
use pokeprice_sdk::cache::is_stale;
use pokeprice_sdk::{CacheStore, Collection, DocumentStore, FileCacheStore, TieredStore};
use serde_json::json;

// ---------------------------------------------------------------------------
// is_stale
// ---------------------------------------------------------------------------

#[test]
fn stale_only_strictly_after_ttl() {
    let ttl = Duration::from_secs(24 * 3600);
    assert!(!is_stale(t0(), ttl, t0() + chrono::Duration::hours(24)));
    assert!(is_stale(t0(), ttl, t0() + chrono::Duration::hours(24) + chrono::Duration::milliseconds(1)));
    assert!(!is_stale(t0(), ttl, t0() + chrono::Duration::hours(23)));
}

// ---------------------------------------------------------------------------
// FileCacheStore
// ---------------------------------------------------------------------------

#[test]
fn file_store_round_trips_payload_and_timestamp() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileCacheStore::new(tmp.path()).unwrap();
    let payload = json!([{ "id": 557, "name": "Prismatic Evolutions" }]);

    store.put_at(Collection::SetList, "all", &payload, t0()).unwrap();
    let entry = store.get(Collection::SetList, "all").unwrap().unwrap();

    assert_eq!(entry.payload, payload);
    assert_eq!(entry.written_at, t0());
    assert_eq!(entry.key, "all");
}

#[test]
fn file_store_put_overwrites() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileCacheStore::new(tmp.path()).unwrap();

    store.put(Collection::CardPricing, "1", &json!({"v": 1})).unwrap();
    store.put(Collection::CardPricing, "1", &json!({"v": 2})).unwrap();

    let entry = store.get(Collection::CardPricing, "1").unwrap().unwrap();
    assert_eq!(entry.payload["v"], 2);
}

#[test]
fn collections_do_not_collide() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileCacheStore::new(tmp.path()).unwrap();

    store.put(Collection::CardsForSet, "557", &json!("cards")).unwrap();
    store.put(Collection::CardPricing, "557", &json!("price")).unwrap();

    assert_eq!(store.get(Collection::CardsForSet, "557").unwrap().unwrap().payload, "cards");
    assert_eq!(store.get(Collection::CardPricing, "557").unwrap().unwrap().payload, "price");
}

#[test]
fn corrupt_file_is_removed_and_reported_as_miss() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileCacheStore::new(tmp.path()).unwrap();
    store.put(Collection::CardsForSet, "557", &json!([])).unwrap();

    let path = tmp.path().join("cards").join("557.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(store.get(Collection::CardsForSet, "557").unwrap().is_none());
    assert!(!path.exists());
}

#[test]
fn file_store_remove_and_clear() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileCacheStore::new(tmp.path()).unwrap();
    store.put(Collection::SetList, "all", &json!([])).unwrap();
    store.put(Collection::CardPricing, "9", &json!({})).unwrap();

    assert!(store.remove(Collection::SetList, "all").unwrap());
    assert!(!store.remove(Collection::SetList, "all").unwrap());

    store.clear().unwrap();
    assert!(store.get(Collection::CardPricing, "9").unwrap().is_none());
}

#[test]
fn unsafe_keys_stay_inside_the_cache_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileCacheStore::new(tmp.path().join("cache")).unwrap();

    store.put(Collection::SetList, "../escape", &json!(1)).unwrap();

    assert!(!tmp.path().join("escape.json").exists());
    assert_eq!(store.get(Collection::SetList, "../escape").unwrap().unwrap().payload, 1);
}

#[test]
fn similar_keys_get_separate_documents() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileCacheStore::new(tmp.path()).unwrap();

    store.put(Collection::CardPricing, "a:b", &json!(1)).unwrap();
    store.put(Collection::CardPricing, "a_b", &json!(2)).unwrap();

    assert_eq!(store.get(Collection::CardPricing, "a:b").unwrap().unwrap().payload, 1);
    assert_eq!(store.get(Collection::CardPricing, "a_b").unwrap().unwrap().payload, 2);
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

#[test]
fn document_store_upserts() {
    let store = DocumentStore::open_in_memory().unwrap();

    store.put_at(Collection::CardPricing, "73002", &json!({"v": 1}), t0()).unwrap();
    let later = t0() + chrono::Duration::hours(2);
    store.put_at(Collection::CardPricing, "73002", &json!({"v": 2}), later).unwrap();

    let entry = store.get(Collection::CardPricing, "73002").unwrap().unwrap();
    assert_eq!(entry.payload, json!({"v": 2}));
    assert_eq!(entry.written_at, later);

    let rows = store
        .execute("SELECT COUNT(*) AS n FROM cache_entries", &[])
        .unwrap();
    assert_eq!(rows[0]["n"], 1);
}

#[test]
fn document_store_miss_and_remove() {
    let store = DocumentStore::open_in_memory().unwrap();
    assert!(store.get(Collection::SetList, "all").unwrap().is_none());

    store.put(Collection::SetList, "all", &json!([])).unwrap();
    assert!(store.remove(Collection::SetList, "all").unwrap());
    assert!(!store.remove(Collection::SetList, "all").unwrap());
}

#[test]
fn document_store_stats_per_collection() {
    let store = DocumentStore::open_in_memory().unwrap();
    store.put_at(Collection::CardPricing, "1", &json!({}), t0()).unwrap();
    store
        .put_at(Collection::CardPricing, "2", &json!({}), t0() + chrono::Duration::hours(1))
        .unwrap();
    store.put_at(Collection::SetList, "all", &json!([]), t0()).unwrap();

    let stats = store.stats().unwrap();

    assert_eq!(stats.len(), 2);
    let pricing = stats.iter().find(|s| s.collection == "pricing").unwrap();
    assert_eq!(pricing.entries, 2);
    assert_eq!(pricing.oldest_written_at, Some(t0()));
    assert_eq!(pricing.newest_written_at, Some(t0() + chrono::Duration::hours(1)));

    store.clear().unwrap();
    assert!(store.stats().unwrap().is_empty());
}

#[test]
fn document_store_persists_to_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("db").join("documents.duckdb");
    {
        let store = DocumentStore::open(&path).unwrap();
        store.put_at(Collection::SetList, "all", &json!(["x"]), t0()).unwrap();
    }

    let reopened = DocumentStore::open(&path).unwrap();
    assert_eq!(
        reopened.get(Collection::SetList, "all").unwrap().unwrap().payload,
        json!(["x"])
    );
}

// ---------------------------------------------------------------------------
// TieredStore
// ---------------------------------------------------------------------------

#[test]
fn tiered_store_back_fills_near_with_original_timestamp() {
    let tmp = tempfile::tempdir().unwrap();
    let near = Arc::new(FileCacheStore::new(tmp.path()).unwrap());
    let far = Arc::new(DocumentStore::open_in_memory().unwrap());
    far.put_at(Collection::CardsForSet, "557", &json!([1, 2]), t0()).unwrap();

    let tiered = TieredStore::new(near.clone(), far.clone());
    let entry = tiered.get(Collection::CardsForSet, "557").unwrap().unwrap();
    assert_eq!(entry.payload, json!([1, 2]));

    let copied = near.get(Collection::CardsForSet, "557").unwrap().unwrap();
    assert_eq!(copied.written_at, t0());
}

#[test]
fn tiered_store_writes_both_tiers() {
    let tmp = tempfile::tempdir().unwrap();
    let near = Arc::new(FileCacheStore::new(tmp.path()).unwrap());
    let far = Arc::new(DocumentStore::open_in_memory().unwrap());
    let tiered = TieredStore::new(near.clone(), far.clone());

    tiered.put_at(Collection::CardPricing, "5", &json!({"p": 1}), t0()).unwrap();

    assert!(near.get(Collection::CardPricing, "5").unwrap().is_some());
    assert!(far.get(Collection::CardPricing, "5").unwrap().is_some());

    tiered.clear().unwrap();
    assert!(tiered.get(Collection::CardPricing, "5").unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Service store access
// ---------------------------------------------------------------------------

/// Records which threads touched the store.
struct ThreadRecordingStore {
    inner: FileCacheStore,
    threads: std::sync::Mutex<Vec<std::thread::ThreadId>>,
}

impl ThreadRecordingStore {
    fn record(&self) {
        self.threads.lock().unwrap().push(std::thread::current().id());
    }
}

impl CacheStore for ThreadRecordingStore {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn get(&self, collection: Collection, key: &str) -> pokeprice_sdk::Result<Option<pokeprice_sdk::CacheEntry>> {
        self.record();
        self.inner.get(collection, key)
    }

    fn put_at(
        &self,
        collection: Collection,
        key: &str,
        payload: &serde_json::Value,
        written_at: chrono::DateTime<chrono::Utc>,
    ) -> pokeprice_sdk::Result<()> {
        self.record();
        self.inner.put_at(collection, key, payload, written_at)
    }

    fn remove(&self, collection: Collection, key: &str) -> pokeprice_sdk::Result<bool> {
        self.record();
        self.inner.remove(collection, key)
    }

    fn clear(&self) -> pokeprice_sdk::Result<()> {
        self.record();
        self.inner.clear()
    }
}

#[tokio::test]
async fn service_store_calls_run_off_the_runtime_thread() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(ThreadRecordingStore {
        inner: FileCacheStore::new(tmp.path()).unwrap(),
        threads: std::sync::Mutex::new(Vec::new()),
    });
    let pricing = Arc::new(common::FakePricing::with_samples());
    let service = pokeprice_sdk::DataService::builder(pricing, store.clone()).build();

    service.get_set_list(false).await.unwrap();
    service.get_cards_for_set(557).await.unwrap();
    service.get_card_pricing(73002, 557).await.unwrap();
    service.clear_cache().await.unwrap();

    let runtime_thread = std::thread::current().id();
    let threads = store.threads.lock().unwrap();
    assert!(threads.len() >= 6);
    assert!(threads.iter().all(|id| *id != runtime_thread));
}
