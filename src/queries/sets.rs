//! Set list retrieval with stale-while-revalidate caching.
//!
//! A cached list is returned immediately; when it is older than the set-list
//! TTL a background task refreshes it. A cold cache races the upstream fetch
//! against the initial-load timeout and serves the static fallback list if
//! the fetch loses or fails. The fetch keeps running after a lost race, so
//! its result still lands in the cache.

use std::collections::HashSet;

use crate::cache::Collection;
use crate::current_sets::CurrentSets;
use crate::error::{PokePriceError, Result};
use crate::models::{PokemonSet, UpstreamSet};
use crate::service::{DataService, ServiceEvent};

pub(crate) const SET_LIST_KEY: &str = "all";

// ---------------------------------------------------------------------------
// SetQuery
// ---------------------------------------------------------------------------

pub struct SetQuery<'a> {
    svc: &'a DataService,
}

impl<'a> SetQuery<'a> {
    pub fn new(svc: &'a DataService) -> Self {
        Self { svc }
    }

    /// All sets in the configured language, newest first.
    ///
    /// Never fails because of the upstream: the worst case is the fallback list.
    pub async fn list(&self, force_refresh: bool) -> Result<Vec<PokemonSet>> {
        let svc = self.svc;
        let cached = svc
            .read_cached::<Vec<PokemonSet>>(Collection::SetList, SET_LIST_KEY)
            .await;

        if !force_refresh {
            if let Some((sets, entry)) = &cached {
                if entry.is_stale(svc.config().set_list_ttl, svc.now()) {
                    tracing::debug!(
                        age_secs = entry.age(svc.now()).as_secs(),
                        "Set list stale, refreshing in background"
                    );
                    spawn_refresh(svc.clone());
                }
                return Ok(sets.clone());
            }
        }

        let result = match &cached {
            // Forced refresh with something to fall back on: no race.
            Some(_) => refresh(svc).await,
            None => race_initial_load(svc).await,
        };

        match result {
            Ok(sets) => Ok(sets),
            Err(e) => {
                tracing::warn!(error = %e, "Set list fetch failed, serving fallback");
                let (sets, reason) = match cached {
                    Some((sets, _)) => (sets, "cached"),
                    None => (self.fallback_list(), "bundled"),
                };
                svc.emit(ServiceEvent::FallbackServed {
                    key: cache_key(),
                    reason: format!("{reason}: {e}"),
                });
                Ok(sets)
            }
        }
    }

    /// Look up one set by id in the (possibly cached) list.
    pub async fn get(&self, set_id: i64) -> Result<Option<PokemonSet>> {
        Ok(self.list(false).await?.into_iter().find(|s| s.id == set_id))
    }

    /// The static fallback list, prepared like a live response.
    pub fn fallback_list(&self) -> Vec<PokemonSet> {
        prepare_sets(self.svc, self.svc.inner.fallback_sets.clone())
    }
}

fn cache_key() -> String {
    format!("{}:{}", Collection::SetList.as_str(), SET_LIST_KEY)
}

async fn race_initial_load(svc: &DataService) -> Result<Vec<PokemonSet>> {
    let limit = svc.config().initial_load_timeout;
    let task = {
        let svc = svc.clone();
        tokio::spawn(async move { refresh(&svc).await })
    };
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(PokePriceError::from(join)),
        Err(_) => Err(PokePriceError::Timeout(limit)),
    }
}

fn spawn_refresh(svc: DataService) {
    tokio::spawn(async move {
        let key = cache_key();
        match refresh(&svc).await {
            Ok(sets) => {
                tracing::info!(count = sets.len(), "Background set list refresh complete");
                svc.emit(ServiceEvent::RefreshSucceeded { key });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Background set list refresh failed");
                svc.emit(ServiceEvent::RefreshFailed {
                    key,
                    error: e.to_string(),
                });
            }
        }
    });
}

/// Fetch, prepare and cache the set list. Concurrent callers share one fetch.
async fn refresh(svc: &DataService) -> Result<Vec<PokemonSet>> {
    let flight = svc.inner.locks.begin(&cache_key()).await;
    if flight.joined() {
        if let Some((sets, _)) = svc
            .read_cached::<Vec<PokemonSet>>(Collection::SetList, SET_LIST_KEY)
            .await
        {
            return Ok(sets);
        }
    }

    let raw = svc.inner.pricing.fetch_sets().await?;
    let sets = prepare_sets(svc, raw);
    tracing::info!(count = sets.len(), "Fetched set list");

    svc.write_cached(Collection::SetList, SET_LIST_KEY, &sets).await;
    let now = svc.now();
    svc.replace_current_sets(CurrentSets::from_set_list(
        &sets,
        now,
        svc.config().current_set_window_days,
    ))
    .await;
    flight.complete();
    Ok(sets)
}

/// Language filter, id assignment, expansion labels, newest-first order.
fn prepare_sets(svc: &DataService, raw: Vec<UpstreamSet>) -> Vec<PokemonSet> {
    let language = svc.config().language.as_deref();
    let raw: Vec<UpstreamSet> = raw
        .into_iter()
        .filter(|s| match (language, s.language.as_deref()) {
            (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
            _ => true,
        })
        .collect();

    let mut sets = assign_set_ids(raw);
    for set in &mut sets {
        set.series_expansion = Some(svc.classifier().classify_set(set));
    }
    sets.sort_by(|a, b| b.release_date.cmp(&a.release_date));
    sets
}

/// Give every set a unique id.
///
/// Existing ids are kept on first occurrence. Sets without one, or with a
/// duplicate, get sequential ids counting up from the largest existing id.
pub fn assign_set_ids(raw: Vec<UpstreamSet>) -> Vec<PokemonSet> {
    let mut next = raw.iter().filter_map(|s| s.id).max().unwrap_or(0) + 1;
    let mut used: HashSet<i64> = HashSet::new();

    raw.into_iter()
        .map(|s| {
            let id = match s.id {
                Some(id) if used.insert(id) => id,
                _ => {
                    while used.contains(&next) {
                        next += 1;
                    }
                    used.insert(next);
                    tracing::debug!(name = %s.name, id = next, "Synthesized set id");
                    next
                }
            };
            PokemonSet {
                id,
                code: s.code,
                name: s.name,
                language: s.language,
                release_date: s.release_date,
                series_expansion: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: Option<i64>, name: &str) -> UpstreamSet {
        UpstreamSet {
            id,
            code: None,
            name: name.to_string(),
            language: None,
            release_date: None,
        }
    }

    #[test]
    fn missing_and_duplicate_ids_are_synthesized() {
        let sets = assign_set_ids(vec![
            raw(Some(5), "a"),
            raw(None, "b"),
            raw(Some(5), "c"),
            raw(Some(2), "d"),
        ]);
        let ids: Vec<i64> = sets.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![5, 6, 7, 2]);
    }

    #[test]
    fn all_missing_starts_at_one() {
        let sets = assign_set_ids(vec![raw(None, "a"), raw(None, "b")]);
        assert_eq!(sets.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2]);
    }
}
