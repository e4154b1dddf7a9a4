use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::de;

// ---------------------------------------------------------------------------
// Card — A PokeData card, optionally enriched with TCG image URLs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: i64,
    #[serde(default, alias = "set_id", deserialize_with = "de::opt_i64_lenient")]
    pub set_id: Option<i64>,
    #[serde(default, alias = "set_code")]
    pub set_code: Option<String>,
    #[serde(alias = "num", alias = "number", deserialize_with = "de::string_or_number")]
    pub card_number: String,
    pub name: String,
    #[serde(default)]
    pub rarity: Option<String>,
    /// Source name to amount, e.g. `"PSA 10.0" -> 412.5`.
    #[serde(default)]
    pub pricing: BTreeMap<String, f64>,
    #[serde(default, alias = "images")]
    pub image_urls: Option<ImageUrls>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrls {
    pub small: Option<String>,
    pub large: Option<String>,
}

// ---------------------------------------------------------------------------
// TcgCard — Pokemon TCG API `/cards` row (only what image matching needs)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcgCard {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "de::string_or_number")]
    pub number: String,
    pub rarity: Option<String>,
    pub images: Option<ImageUrls>,
}

/// Card numbers compare without leading zeros: `"007"` matches `"7"`.
pub fn card_number_key(number: &str) -> String {
    let trimmed = number.trim();
    let stripped = trimmed.trim_start_matches('0');
    if stripped.is_empty() && !trimmed.is_empty() {
        "0".to_string()
    } else {
        stripped.to_ascii_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_number_key_ignores_leading_zeros() {
        assert_eq!(card_number_key("007"), "7");
        assert_eq!(card_number_key("7"), "7");
        assert_eq!(card_number_key("000"), "0");
        assert_eq!(card_number_key("tg05"), "TG05");
    }

    #[test]
    fn card_accepts_pokedata_field_names() {
        let card: Card = serde_json::from_value(serde_json::json!({
            "id": 73121,
            "set_id": "557",
            "set_code": "PRE",
            "num": "001",
            "name": "Exeggcute"
        }))
        .unwrap();
        assert_eq!(card.set_id, Some(557));
        assert_eq!(card.set_code.as_deref(), Some("PRE"));
        assert_eq!(card.card_number, "001");
        assert!(card.pricing.is_empty());
        assert!(card.image_urls.is_none());
    }
}
