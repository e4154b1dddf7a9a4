//! Matching Pokemon TCG sets to PokeData sets.
//!
//! The two APIs key sets independently: TCG uses ids like `sv8pt5` with an
//! optional PTCGO code, PokeData uses integer ids with its own short codes.
//! [`reconcile`] links them by trying, in order, a manual override table, an
//! exact code match, an exact normalized-name match, name similarity within
//! a release-date window, and a match on names with series prefixes and
//! generic suffixes removed. The first strategy that hits wins.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{NaiveDate, Utc};

use crate::models::{
    MatchType, SetMapping, SetMappingTable, SetSource, TcgSet, UnmappedSet, UpstreamSet,
};

// ---------------------------------------------------------------------------
// ReconcileOptions
// ---------------------------------------------------------------------------

/// Thresholds and tables for the matching heuristics.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// TCG set id -> PokeData code. Always applied, never overridden.
    pub manual_overrides: BTreeMap<String, String>,
    /// PokeData sets in other languages are ignored. `None` keeps all.
    pub language: Option<String>,
    /// Maximum release-date distance for a name-similarity match.
    pub date_window_days: i64,
    /// Words two names must share to count as similar.
    pub min_shared_words: usize,
    /// Words this short or shorter are not counted as shared.
    pub max_ignored_word_len: usize,
    /// Leading series tokens dropped before the cleaned-name comparison.
    pub series_prefixes: Vec<String>,
    /// Trailing tokens dropped before the cleaned-name comparison.
    pub generic_suffixes: Vec<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        let manual = [
            ("sv8pt5", "PRE"),
            ("sv6pt5", "SFA"),
            ("sv4pt5", "PAF"),
            ("sv3pt5", "MEW"),
            ("swsh12pt5", "CRZ"),
            ("swsh45", "SHF"),
            ("cel25", "CEL"),
            ("pgo", "PGO"),
        ];
        Self {
            manual_overrides: manual
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
            language: Some(crate::config::DEFAULT_LANGUAGE.to_string()),
            date_window_days: 90,
            min_shared_words: 2,
            max_ignored_word_len: 2,
            series_prefixes: ["ex", "xy", "sm", "swsh", "sv", "bw", "dp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            generic_suffixes: vec!["base".to_string(), "set".to_string()],
        }
    }
}

// ---------------------------------------------------------------------------
// Name helpers
// ---------------------------------------------------------------------------

/// Lowercase, drop punctuation, collapse whitespace. `&` becomes `and`.
pub fn normalize_name(name: &str) -> String {
    let replaced = name.to_lowercase().replace('&', " and ").replace('é', "e");
    let cleaned: String = replaced
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`normalize_name`] minus one leading series token and one trailing generic suffix.
pub fn clean_name(name: &str, opts: &ReconcileOptions) -> String {
    let normalized = normalize_name(name);
    let mut words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();

    if words.len() > 1 && opts.series_prefixes.iter().any(|p| p == words[0]) {
        words.remove(0);
    }
    if words.len() > 1
        && words
            .last()
            .is_some_and(|w| opts.generic_suffixes.iter().any(|s| s == w))
    {
        words.pop();
    }
    words.join(" ")
}

fn significant_words<'a>(name: &'a str, opts: &ReconcileOptions) -> HashSet<&'a str> {
    name.split(' ')
        .filter(|w| w.chars().count() > opts.max_ignored_word_len)
        .collect()
}

fn names_similar(a: &str, b: &str, opts: &ReconcileOptions) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(b) || b.contains(a) {
        return true;
    }
    let wa = significant_words(a, opts);
    let wb = significant_words(b, opts);
    wa.intersection(&wb).count() >= opts.min_shared_words
}

fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// Link each TCG set to at most one PokeData set.
///
/// Sets no strategy can match are listed in `unmapped`, from both sides.
pub fn reconcile(tcg_sets: &[TcgSet], pokedata_sets: &[UpstreamSet], opts: &ReconcileOptions) -> SetMappingTable {
    let candidates: Vec<&UpstreamSet> = pokedata_sets
        .iter()
        .filter(|s| match (&opts.language, &s.language) {
            (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
            (Some(_), None) => true,
            (None, _) => true,
        })
        .collect();
    let normalized: Vec<String> = candidates.iter().map(|s| normalize_name(&s.name)).collect();
    let cleaned: Vec<String> = candidates.iter().map(|s| clean_name(&s.name, opts)).collect();

    let mut table = SetMappingTable {
        generated_at: Some(Utc::now()),
        ..Default::default()
    };
    let mut claimed: BTreeSet<usize> = BTreeSet::new();

    for tcg in tcg_sets {
        if table.mappings.contains_key(&tcg.id) {
            tracing::debug!(tcg_set = %tcg.id, "Duplicate TCG set id, keeping first mapping");
            continue;
        }
        let found = match_one(tcg, &candidates, &normalized, &cleaned, opts);
        let Some((idx, match_type, code_override)) = found else {
            table.unmapped.push(UnmappedSet {
                source: SetSource::PokemonTcg,
                id: tcg.id.clone(),
                code: tcg.ptcgo_code.clone(),
                name: tcg.name.clone(),
            });
            continue;
        };

        let target = idx.map(|i| candidates[i]);
        if let Some(i) = idx {
            claimed.insert(i);
        }
        let mapping = SetMapping {
            external_set_id: tcg.id.clone(),
            pokedata_code: code_override.or_else(|| target.and_then(|t| t.code.clone())),
            pokedata_id: target.and_then(|t| t.id),
            match_type,
        };
        tracing::debug!(
            tcg_set = %tcg.id,
            pokedata_code = ?mapping.pokedata_code,
            match_type = match_type.as_str(),
            "Mapped set"
        );
        *table.match_counts.entry(match_type).or_insert(0) += 1;
        table.mappings.insert(tcg.id.clone(), mapping);
    }

    for (i, set) in candidates.iter().enumerate() {
        if !claimed.contains(&i) {
            table.unmapped.push(UnmappedSet {
                source: SetSource::PokeData,
                id: set.id.map(|id| id.to_string()).unwrap_or_default(),
                code: set.code.clone(),
                name: set.name.clone(),
            });
        }
    }

    tracing::info!(
        mapped = table.mappings.len(),
        unmapped = table.unmapped.len(),
        "Set reconciliation complete"
    );
    table
}

/// Returns the matched candidate index (absent for a manual override whose
/// code is not in the candidate list), the strategy, and for manual matches
/// the override code.
fn match_one(
    tcg: &TcgSet,
    candidates: &[&UpstreamSet],
    normalized: &[String],
    cleaned: &[String],
    opts: &ReconcileOptions,
) -> Option<(Option<usize>, MatchType, Option<String>)> {
    if let Some(code) = opts.manual_overrides.get(&tcg.id) {
        let idx = candidates
            .iter()
            .position(|s| s.code.as_deref() == Some(code.as_str()));
        return Some((idx, MatchType::Manual, Some(code.clone())));
    }

    if let Some(ptcgo) = tcg.ptcgo_code.as_deref().filter(|c| !c.is_empty()) {
        if let Some(i) = candidates
            .iter()
            .position(|s| s.code.as_deref() == Some(ptcgo))
        {
            return Some((Some(i), MatchType::PtcgoCode, None));
        }
    }

    let name = normalize_name(&tcg.name);
    if let Some(i) = normalized.iter().position(|n| !n.is_empty() && *n == name) {
        return Some((Some(i), MatchType::ExactName, None));
    }

    if let Some(tcg_date) = tcg.release_date {
        let best = normalized
            .iter()
            .enumerate()
            .filter(|(_, n)| names_similar(&name, n, opts))
            .filter_map(|(i, _)| {
                let delta = days_between(tcg_date, candidates[i].release_date?);
                (delta <= opts.date_window_days).then_some((i, delta))
            })
            .min_by_key(|(_, delta)| *delta);
        if let Some((i, _)) = best {
            return Some((Some(i), MatchType::NameDateSimilarity, None));
        }
    }

    let tcg_clean = clean_name(&tcg.name, opts);
    if !tcg_clean.is_empty() {
        if let Some(i) = cleaned.iter().position(|c| *c == tcg_clean) {
            return Some((Some(i), MatchType::CleanedName, None));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_name_strips_punctuation() {
        assert_eq!(normalize_name("  Scarlet & Violet: 151 "), "scarlet and violet 151");
        assert_eq!(normalize_name("Pokémon GO"), "pokemon go");
        assert_eq!(normalize_name("Champion's Path"), "champion s path");
    }

    #[test]
    fn clean_name_drops_series_prefix_and_suffix() {
        let opts = ReconcileOptions::default();
        assert_eq!(clean_name("SWSH Evolving Skies", &opts), "evolving skies");
        assert_eq!(clean_name("XY Base Set", &opts), "base");
        assert_eq!(clean_name("Jungle Set", &opts), "jungle");
        assert_eq!(clean_name("Jungle Base Set", &opts), "jungle base");
        // a lone prefix is kept
        assert_eq!(clean_name("XY", &opts), "xy");
    }

    #[test]
    fn similarity_needs_two_long_shared_words() {
        let opts = ReconcileOptions::default();
        assert!(names_similar("paldean fates", "paldean fates promos", &opts));
        assert!(names_similar("shining legends tin", "legends shining box", &opts));
        assert!(!names_similar("lost origin", "lost thunder", &opts));
        assert!(!names_similar("ex go", "go ex", &opts));
    }
}
