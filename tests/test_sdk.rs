//! SDK facade tests in offline mode (no network).

use std::io::Write;

use pokeprice_sdk::models::{MatchType, SetMapping, SetMappingTable};
use pokeprice_sdk::{PokePriceError, PokePriceSdk};

fn offline_sdk(dir: &std::path::Path) -> PokePriceSdk {
    PokePriceSdk::builder()
        .cache_dir(dir)
        .offline(true)
        .build()
        .unwrap()
}

#[tokio::test]
async fn offline_set_list_is_the_bundled_fallback() {
    let tmp = tempfile::tempdir().unwrap();
    let sdk = offline_sdk(tmp.path());

    let sets = sdk.sets().list(false).await.unwrap();

    assert!(sets.iter().any(|s| s.name == "Prismatic Evolutions"));
    assert!(sets.windows(2).all(|w| w[0].release_date >= w[1].release_date));
}

#[tokio::test]
async fn offline_cards_are_empty_and_pricing_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let sdk = offline_sdk(tmp.path());

    assert!(sdk.cards().for_set(557).await.unwrap().is_empty());
    assert!(matches!(
        sdk.prices().get(73002, 557).await,
        Err(PokePriceError::NotFound(_))
    ));
}

#[tokio::test]
async fn offline_reconcile_is_refused() {
    let tmp = tempfile::tempdir().unwrap();
    let sdk = offline_sdk(tmp.path());

    assert!(matches!(
        sdk.reconcile_sets().await,
        Err(PokePriceError::NotFound(_))
    ));
}

#[test]
fn mapping_file_is_loaded_at_build() {
    let tmp = tempfile::tempdir().unwrap();
    let mut table = SetMappingTable::default();
    table.mappings.insert(
        "sv8pt5".to_string(),
        SetMapping {
            external_set_id: "sv8pt5".to_string(),
            pokedata_code: Some("PRE".to_string()),
            pokedata_id: Some(557),
            match_type: MatchType::Manual,
        },
    );
    table.save(&tmp.path().join("set_mapping.json")).unwrap();

    let sdk = offline_sdk(tmp.path());

    assert_eq!(sdk.service().mapping().len(), 1);
    assert!(sdk.to_string().contains("mapped_sets=1"));
}

#[test]
fn unreadable_mapping_file_is_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("set_mapping.json"), "garbage").unwrap();

    let sdk = offline_sdk(tmp.path());

    assert!(sdk.service().mapping().is_empty());
}

#[test]
fn document_store_layers_behind_file_cache() {
    let tmp = tempfile::tempdir().unwrap();
    let sdk = PokePriceSdk::builder()
        .cache_dir(tmp.path())
        .offline(true)
        .document_store(true)
        .build()
        .unwrap();

    assert_eq!(sdk.service().store().name(), "tiered");
    assert!(tmp.path().join("documents.duckdb").exists());
    assert!(sdk.to_string().contains("offline=true"));
}

#[tokio::test]
async fn gzipped_fallback_file_replaces_bundled_list() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("fallback.json.gz");
    let body = serde_json::json!({
        "data": [
            { "id": 1, "code": "AAA", "name": "Only Set", "language": "ENGLISH", "release_date": "2024-05-01" }
        ]
    });
    let mut gz = flate2::write::GzEncoder::new(
        std::fs::File::create(&path).unwrap(),
        flate2::Compression::default(),
    );
    gz.write_all(body.to_string().as_bytes()).unwrap();
    gz.finish().unwrap();

    let sdk = PokePriceSdk::builder()
        .cache_dir(tmp.path())
        .offline(true)
        .fallback_file(&path)
        .build()
        .unwrap();
    let sets = sdk.sets().list(false).await.unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].code.as_deref(), Some("AAA"));
    assert_eq!(sets[0].series_expansion.as_deref(), Some("Other"));
}

#[tokio::test]
async fn clear_cache_empties_every_collection() {
    let tmp = tempfile::tempdir().unwrap();
    let sdk = offline_sdk(tmp.path());
    sdk.service()
        .store()
        .put(pokeprice_sdk::Collection::CardPricing, "1", &serde_json::json!({}))
        .unwrap();

    sdk.clear_cache().await.unwrap();

    assert!(sdk.service().cached_pricing(1).await.is_none());
}
