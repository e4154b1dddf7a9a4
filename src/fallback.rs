//! Static set list served when PokeData is unreachable and nothing is cached.
//!
//! A snapshot ships inside the crate; a newer one can be supplied as a
//! `.json` or gzip-compressed `.json.gz` file.

use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{PokePriceError, Result};
use crate::models::UpstreamSet;
use crate::upstream::normalize_list;

const BUNDLED: &str = include_str!("../data/fallback_sets.json");

/// The snapshot compiled into the crate.
pub fn bundled_sets() -> Vec<UpstreamSet> {
    let parsed = serde_json::from_str(BUNDLED)
        .map_err(PokePriceError::from)
        .and_then(|body| normalize_list("bundled fallback", body));
    match parsed {
        Ok(sets) => sets,
        Err(e) => {
            tracing::error!(error = %e, "Bundled fallback set list is unreadable");
            Vec::new()
        }
    }
}

/// Load a fallback set list from disk (handles `.gz` transparently).
///
/// Accepts the same shapes as the live `/sets` endpoint.
pub fn load_sets(path: &Path) -> Result<Vec<UpstreamSet>> {
    let contents = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        let file = fs::File::open(path)?;
        let mut decoder = BufReader::new(GzDecoder::new(BufReader::new(file)));
        let mut contents = String::new();
        decoder.read_to_string(&mut contents)?;
        contents
    } else {
        fs::read_to_string(path)?
    };
    let body: serde_json::Value = serde_json::from_str(&contents)?;
    normalize_list("fallback file", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_snapshot_parses() {
        let sets = bundled_sets();
        assert!(sets.len() >= 10);
        assert!(sets.iter().all(|s| s.id.is_some()));
        assert!(sets.iter().any(|s| s.code.as_deref() == Some("PRE")));
    }
}
