//! Shared test fixtures for the pokeprice-sdk integration tests.
//!
//! Provides fake upstream sources with call counters and a failure switch,
//! a small sample of sets and cards, and `setup_service()` which wires them
//! into a `DataService` over a temporary file cache and a manual clock.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

use pokeprice_sdk::models::{
    Card, CardPricing, ImageUrls, PriceQuote, TcgCard, TcgSet, UpstreamSet,
};
use pokeprice_sdk::upstream::{normalize_list, CardImageSource, PricingSource};
use pokeprice_sdk::{
    DataService, FileCacheStore, ManualClock, PokePriceError, Result, ServiceConfig,
};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Fixed start time for every test clock.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

// ---------------------------------------------------------------------------
// Sample data
// ---------------------------------------------------------------------------

pub fn upstream_set(id: Option<i64>, code: Option<&str>, name: &str, released: Option<NaiveDate>) -> UpstreamSet {
    UpstreamSet {
        id,
        code: code.map(str::to_string),
        name: name.to_string(),
        language: Some("ENGLISH".to_string()),
        release_date: released,
    }
}

/// PokeData `/sets`: three English sets and one Japanese set.
pub fn sample_sets() -> Vec<UpstreamSet> {
    let mut japanese = upstream_set(Some(900), Some("SV8a"), "Terastal Festival ex", date(2024, 12, 6));
    japanese.language = Some("JAPANESE".to_string());
    vec![
        upstream_set(Some(557), Some("PRE"), "Prismatic Evolutions", date(2025, 1, 17)),
        upstream_set(Some(520), Some("CRZ"), "Crown Zenith", date(2023, 1, 20)),
        upstream_set(Some(100), Some("BS"), "Base Set", date(1999, 1, 9)),
        japanese,
    ]
}

/// Raw card objects as PokeData returns them for set 557.
pub fn sample_card_values() -> Vec<Value> {
    vec![
        json!({"id": 73001, "set_id": 557, "set_code": "PRE", "num": "074", "name": "Eevee", "rarity": "Common"}),
        json!({"id": 73002, "set_id": 557, "set_code": "PRE", "num": 161, "name": "Umbreon ex", "rarity": "Special Illustration Rare"}),
    ]
}

pub fn sample_pricing(card_id: i64, value: f64) -> CardPricing {
    let mut pricing = std::collections::BTreeMap::new();
    pricing.insert(
        "TCGPlayer".to_string(),
        PriceQuote {
            value: Some(value),
            currency: Some("USD".to_string()),
        },
    );
    CardPricing {
        card_id,
        name: Some("Umbreon ex".to_string()),
        set_name: Some("Prismatic Evolutions".to_string()),
        card_number: Some("161".to_string()),
        pricing,
    }
}

pub fn tcg_set(id: &str, name: &str, ptcgo: Option<&str>, released: Option<NaiveDate>) -> TcgSet {
    TcgSet {
        id: id.to_string(),
        name: name.to_string(),
        series: None,
        ptcgo_code: ptcgo.map(str::to_string),
        release_date: released,
        printed_total: None,
        total: None,
    }
}

pub fn tcg_card(set: &str, number: &str) -> TcgCard {
    TcgCard {
        id: format!("{set}-{number}"),
        name: format!("card {number}"),
        number: number.to_string(),
        rarity: None,
        images: Some(ImageUrls {
            small: Some(format!("https://images.example/{set}/{number}.png")),
            large: Some(format!("https://images.example/{set}/{number}_hires.png")),
        }),
    }
}

// ---------------------------------------------------------------------------
// FakePricing
// ---------------------------------------------------------------------------

fn unavailable(what: &str) -> PokePriceError {
    PokePriceError::Upstream {
        status: 503,
        url: format!("https://fake.pokedata/{what}"),
        body: "service unavailable".to_string(),
    }
}

/// In-memory PokeData. Card responses are stored as raw JSON bodies and go
/// through the same envelope normalization as the real client.
#[derive(Default)]
pub struct FakePricing {
    pub sets: Mutex<Vec<UpstreamSet>>,
    /// Raw `/sets` body; when present it replaces `sets`.
    pub set_body: Mutex<Option<Value>>,
    pub card_bodies: Mutex<HashMap<i64, Value>>,
    pub pricing: Mutex<HashMap<i64, CardPricing>>,
    pub failing: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
    pub set_calls: AtomicUsize,
    pub card_calls: AtomicUsize,
    pub pricing_calls: AtomicUsize,
}

impl FakePricing {
    pub fn with_samples() -> Self {
        let fake = Self::default();
        *fake.sets.lock().unwrap() = sample_sets();
        fake.card_bodies
            .lock()
            .unwrap()
            .insert(557, json!({ "data": sample_card_values() }));
        fake.pricing
            .lock()
            .unwrap()
            .insert(73002, sample_pricing(73002, 850.0));
        fake
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn set_sets_body(&self, body: Value) {
        *self.set_body.lock().unwrap() = Some(body);
    }

    pub fn set_card_body(&self, set_id: i64, body: Value) {
        self.card_bodies.lock().unwrap().insert(set_id, body);
    }

    pub fn set_pricing(&self, pricing: CardPricing) {
        self.pricing.lock().unwrap().insert(pricing.card_id, pricing);
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn card_calls(&self) -> usize {
        self.card_calls.load(Ordering::SeqCst)
    }

    pub fn pricing_calls(&self) -> usize {
        self.pricing_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check(&self, what: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(unavailable(what))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PricingSource for FakePricing {
    async fn fetch_sets(&self) -> Result<Vec<UpstreamSet>> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check("sets")?;
        let body = self.set_body.lock().unwrap().clone();
        match body {
            Some(body) => normalize_list("fake /sets", body),
            None => Ok(self.sets.lock().unwrap().clone()),
        }
    }

    async fn fetch_cards(&self, set_id: i64) -> Result<Vec<Card>> {
        self.card_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check("set")?;
        let body = self
            .card_bodies
            .lock()
            .unwrap()
            .get(&set_id)
            .cloned()
            .unwrap_or_else(|| json!([]));
        normalize_list("fake /set", body)
    }

    async fn fetch_pricing(&self, card_id: i64) -> Result<CardPricing> {
        self.pricing_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check("pricing")?;
        self.pricing
            .lock()
            .unwrap()
            .get(&card_id)
            .cloned()
            .ok_or_else(|| PokePriceError::NotFound(format!("card {card_id}")))
    }
}

// ---------------------------------------------------------------------------
// FakeImages
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeImages {
    pub sets: Mutex<Vec<TcgSet>>,
    pub cards: Mutex<HashMap<String, Vec<TcgCard>>>,
    pub failing: AtomicBool,
    pub card_calls: AtomicUsize,
}

impl FakeImages {
    pub fn with_samples() -> Self {
        let fake = Self::default();
        *fake.sets.lock().unwrap() = vec![
            tcg_set("sv8pt5", "Prismatic Evolutions", Some("PRE"), date(2025, 1, 17)),
            tcg_set("swsh12pt5", "Crown Zenith", Some("CRZ"), date(2023, 1, 20)),
            tcg_set("base1", "Base", Some("BS"), date(1999, 1, 9)),
        ];
        fake.cards.lock().unwrap().insert(
            "sv8pt5".to_string(),
            vec![tcg_card("sv8pt5", "74"), tcg_card("sv8pt5", "161")],
        );
        fake
    }
}

#[async_trait]
impl CardImageSource for FakeImages {
    async fn fetch_sets(&self) -> Result<Vec<TcgSet>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("tcg sets"));
        }
        Ok(self.sets.lock().unwrap().clone())
    }

    async fn fetch_cards(&self, set_id: &str) -> Result<Vec<TcgCard>> {
        self.card_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("tcg cards"));
        }
        Ok(self.cards.lock().unwrap().get(set_id).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Service wiring
// ---------------------------------------------------------------------------

pub struct Harness {
    pub service: DataService,
    pub pricing: Arc<FakePricing>,
    pub images: Arc<FakeImages>,
    pub clock: Arc<ManualClock>,
    pub _tmp: tempfile::TempDir,
}

/// A `DataService` over a temporary file cache, the sample fakes and a
/// manual clock at [`t0`].
pub fn setup_service() -> Harness {
    setup_service_with(ServiceConfig::default(), |b| b)
}

/// Like [`setup_service`], with a custom config and extra builder steps.
pub fn setup_service_with(
    config: ServiceConfig,
    extra: impl FnOnce(pokeprice_sdk::service::DataServiceBuilder) -> pokeprice_sdk::service::DataServiceBuilder,
) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCacheStore::new(tmp.path()).unwrap());
    let pricing = Arc::new(FakePricing::with_samples());
    let images = Arc::new(FakeImages::with_samples());
    let clock = Arc::new(ManualClock::new(t0()));

    let builder = DataService::builder(pricing.clone(), store)
        .images(images.clone())
        .clock(clock.clone())
        .config(config);
    let service = extra(builder).build();

    Harness {
        service,
        pricing,
        images,
        clock,
        _tmp: tmp,
    }
}
