//! Snapshot of which sets are "current", i.e. recently released and still
//! gaining cards, so their card lists are re-fetched periodically instead of
//! cached forever.
//!
//! A [`CurrentSets`] value never changes after construction. The service
//! derives a new snapshot from each fresh set list and swaps it in whole.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::PokemonSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSets {
    set_ids: BTreeSet<i64>,
    updated_at: Option<DateTime<Utc>>,
}

impl CurrentSets {
    pub fn new<I: IntoIterator<Item = i64>>(set_ids: I, updated_at: DateTime<Utc>) -> Self {
        Self {
            set_ids: set_ids.into_iter().collect(),
            updated_at: Some(updated_at),
        }
    }

    /// Sets released within `window_days` of `now`. Sets with a future release date count too.
    pub fn from_set_list(sets: &[PokemonSet], now: DateTime<Utc>, window_days: i64) -> Self {
        let cutoff: NaiveDate = (now - Duration::days(window_days)).date_naive();
        Self::new(
            sets.iter()
                .filter(|s| s.release_date.is_some_and(|d| d >= cutoff))
                .map(|s| s.id),
            now,
        )
    }

    pub fn contains(&self, set_id: i64) -> bool {
        self.set_ids.contains(&set_id)
    }

    pub fn set_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.set_ids.iter().copied()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn len(&self) -> usize {
        self.set_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set_ids.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn set(id: i64, date: Option<(i32, u32, u32)>) -> PokemonSet {
        PokemonSet {
            id,
            code: None,
            name: format!("Set {id}"),
            language: None,
            release_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            series_expansion: None,
        }
    }

    #[test]
    fn recent_and_upcoming_sets_are_current() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let sets = vec![
            set(1, Some((2025, 1, 17))),
            set(2, Some((2024, 1, 1))),
            set(3, Some((2025, 5, 30))),
            set(4, None),
        ];
        let current = CurrentSets::from_set_list(&sets, now, 90);
        assert_eq!(current.set_ids().collect::<Vec<_>>(), vec![1, 3]);
    }
}
