use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PokePriceError, Result};

// ---------------------------------------------------------------------------
// MatchType — Which reconciliation strategy produced a mapping
// ---------------------------------------------------------------------------

/// Declaration order is confidence order: `Manual` is the most trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Manual,
    PtcgoCode,
    ExactName,
    NameDateSimilarity,
    CleanedName,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Manual => "manual",
            MatchType::PtcgoCode => "ptcgo_code",
            MatchType::ExactName => "exact_name",
            MatchType::NameDateSimilarity => "name_date_similarity",
            MatchType::CleanedName => "cleaned_name",
        }
    }
}

// ---------------------------------------------------------------------------
// SetMapping — One Pokemon TCG set linked to one PokeData set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMapping {
    pub external_set_id: String,
    #[serde(rename = "pokeDataCode", alias = "internalCode")]
    pub pokedata_code: Option<String>,
    #[serde(rename = "pokeDataId", alias = "internalId")]
    pub pokedata_id: Option<i64>,
    pub match_type: MatchType,
}

/// Which list an unmatched set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetSource {
    PokemonTcg,
    PokeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmappedSet {
    pub source: SetSource,
    pub id: String,
    pub code: Option<String>,
    pub name: String,
}

// ---------------------------------------------------------------------------
// SetMappingTable — Persisted reconciler output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetMappingTable {
    pub generated_at: Option<DateTime<Utc>>,
    /// Keyed by Pokemon TCG set id.
    #[serde(default)]
    pub mappings: BTreeMap<String, SetMapping>,
    #[serde(default)]
    pub unmapped: Vec<UnmappedSet>,
    /// How many mappings each strategy contributed.
    #[serde(default)]
    pub match_counts: BTreeMap<MatchType, usize>,
}

/// Entry of the flat `externalSetId -> {internalCode, internalId, matchType}` file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatMapping {
    #[serde(alias = "pokeDataCode")]
    internal_code: Option<String>,
    #[serde(alias = "pokeDataId")]
    internal_id: Option<i64>,
    match_type: MatchType,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MappingFile {
    Table(SetMappingTable),
    Flat(BTreeMap<String, FlatMapping>),
}

impl From<MappingFile> for SetMappingTable {
    fn from(file: MappingFile) -> Self {
        match file {
            MappingFile::Table(table) => table,
            MappingFile::Flat(flat) => {
                let mut table = SetMappingTable::default();
                for (external_set_id, entry) in flat {
                    *table.match_counts.entry(entry.match_type).or_default() += 1;
                    table.mappings.insert(
                        external_set_id.clone(),
                        SetMapping {
                            external_set_id,
                            pokedata_code: entry.internal_code,
                            pokedata_id: entry.internal_id,
                            match_type: entry.match_type,
                        },
                    );
                }
                table
            }
        }
    }
}

impl SetMappingTable {
    /// Load a mapping table written by [`save`](Self::save), or a flat
    /// `externalSetId -> {internalCode, internalId, matchType}` map.
    ///
    /// A file in neither shape is an error rather than an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let file: MappingFile = serde_json::from_str(&contents).map_err(|_| {
            PokePriceError::InvalidArgument(format!(
                "{} is neither a mapping table nor a flat set mapping",
                path.display()
            ))
        })?;
        Ok(file.into())
    }

    /// Write the table as pretty JSON, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = dir.unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn get(&self, external_set_id: &str) -> Option<&SetMapping> {
        self.mappings.get(external_set_id)
    }

    /// Find the Pokemon TCG set linked to a PokeData set, by id first and then by code.
    pub fn external_for(&self, pokedata_id: i64, pokedata_code: Option<&str>) -> Option<&SetMapping> {
        self.mappings
            .values()
            .find(|m| m.pokedata_id == Some(pokedata_id))
            .or_else(|| {
                let code = pokedata_code?;
                self.mappings
                    .values()
                    .find(|m| m.pokedata_code.as_deref() == Some(code))
            })
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
