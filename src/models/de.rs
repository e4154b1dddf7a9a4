//! Lenient field deserializers shared by the upstream models.
//!
//! PokeData and the Pokemon TCG API disagree on date formats and on whether
//! identifiers are strings or numbers, so the models accept either.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serializer};

/// Parse a release date in any of the formats the upstream APIs emit.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(raw) {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    // "2025-01-17T00:00:00" without an offset
    raw.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
}

pub mod release_date {
    use super::*;

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().and_then(parse_release_date))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::String(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        }
    }
}

/// Card numbers arrive as `"001"`, `"TG05"` or a bare `1`.
pub fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(StringOrNumber::deserialize(d)?.into_string())
}

pub fn opt_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let raw: Option<StringOrNumber> = Option::deserialize(d)?;
    Ok(raw.map(StringOrNumber::into_string))
}

/// Numeric ids that are sometimes quoted.
pub fn opt_i64_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let raw: Option<StringOrNumber> = Option::deserialize(d)?;
    Ok(match raw {
        None => None,
        Some(StringOrNumber::Int(n)) => Some(n),
        Some(StringOrNumber::Float(f)) if f.fract() == 0.0 => Some(f as i64),
        Some(StringOrNumber::Float(_)) => None,
        Some(StringOrNumber::String(s)) => s.trim().parse().ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_upstream_date_format() {
        let want = NaiveDate::from_ymd_opt(2025, 1, 17);
        assert_eq!(parse_release_date("2025-01-17"), want);
        assert_eq!(parse_release_date("2025/01/17"), want);
        assert_eq!(parse_release_date("Fri, 17 Jan 2025 00:00:00 GMT"), want);
        assert_eq!(parse_release_date("2025-01-17T00:00:00Z"), want);
        assert_eq!(parse_release_date("2025-01-17T00:00:00"), want);
        assert_eq!(parse_release_date(""), None);
        assert_eq!(parse_release_date("soon"), None);
    }
}
