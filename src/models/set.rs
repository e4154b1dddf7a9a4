use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::de;

// ---------------------------------------------------------------------------
// PokemonSet — A set as returned to callers (id always present)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PokemonSet {
    pub id: i64,
    pub code: Option<String>,
    pub name: String,
    pub language: Option<String>,
    #[serde(default, with = "de::release_date")]
    pub release_date: Option<NaiveDate>,
    pub series_expansion: Option<String>,
}

// ---------------------------------------------------------------------------
// UpstreamSet — PokeData `/sets` row before id synthesis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamSet {
    #[serde(default, deserialize_with = "de::opt_i64_lenient")]
    pub id: Option<i64>,
    pub code: Option<String>,
    pub name: String,
    pub language: Option<String>,
    #[serde(default, alias = "release_date", with = "de::release_date")]
    pub release_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// TcgSet — Pokemon TCG API `/sets` row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcgSet {
    pub id: String,
    pub name: String,
    pub series: Option<String>,
    pub ptcgo_code: Option<String>,
    #[serde(default, with = "de::release_date")]
    pub release_date: Option<NaiveDate>,
    pub printed_total: Option<i64>,
    pub total: Option<i64>,
}

// ---------------------------------------------------------------------------
// ExpansionGroup — Sets bucketed under one expansion label
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionGroup {
    pub label: String,
    pub sets: Vec<PokemonSet>,
}
