//! Expansion labels ("Scarlet & Violet", "Sword & Shield", ...) for sets.
//!
//! Classification tries the set code first (an exact special-case table,
//! then ordered regex patterns) and the set name second (an exact table,
//! then any known label contained in the name, then substring overlap with
//! the name table in either direction). Anything left over is
//! [`FALLBACK_LABEL`]. No step can fail, so every set gets a label.

use std::collections::HashMap;

use regex::Regex;

use crate::models::{ExpansionGroup, PokemonSet};

pub const FALLBACK_LABEL: &str = "Other";

const SV: &str = "Scarlet & Violet";
const SWSH: &str = "Sword & Shield";
const SM: &str = "Sun & Moon";
const XY: &str = "XY";
const BW: &str = "Black & White";
const HGSS: &str = "HeartGold & SoulSilver";
const PLAT: &str = "Platinum";
const DP: &str = "Diamond & Pearl";
const EX: &str = "EX";
const ECARD: &str = "E-Card";
const NEO: &str = "Neo";
const GYM: &str = "Gym";
const BASE: &str = "Base";

// ---------------------------------------------------------------------------
// ClassifierRules
// ---------------------------------------------------------------------------

/// Tables the classifier is built from. Patterns are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    /// Exact set code -> label.
    pub special_codes: Vec<(String, String)>,
    /// Ordered (code regex, label) pairs; first match wins.
    pub code_patterns: Vec<(String, String)>,
    /// Exact set name -> label.
    pub names: Vec<(String, String)>,
    /// Labels listed first when grouping, in this order.
    pub priority: Vec<String>,
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            special_codes: pairs(&[
                ("PRE", SV),
                ("SFA", SV),
                ("PAF", SV),
                ("MEW", SV),
                ("CRZ", SWSH),
                ("PGO", SWSH),
                ("CEL", SWSH),
                ("SHF", SWSH),
                ("HIF", SM),
                ("DRM", SM),
                ("GEN", XY),
                ("DCR", XY),
                ("LTR", BW),
                ("DRV", BW),
            ]),
            code_patterns: pairs(&[
                (r"^sv", SV),
                (r"^swsh", SWSH),
                (r"^sm", SM),
                (r"^xy", XY),
                (r"^bw", BW),
                (r"^(hgss|hs|col)", HGSS),
                (r"^pl", PLAT),
                (r"^dp", DP),
                (r"^ex", EX),
                (r"^ecard", ECARD),
                (r"^neo", NEO),
                (r"^gym", GYM),
                (r"^(base|bs)\d*$", BASE),
            ]),
            names: pairs(&[
                ("Prismatic Evolutions", SV),
                ("Surging Sparks", SV),
                ("Stellar Crown", SV),
                ("Shrouded Fable", SV),
                ("Twilight Masquerade", SV),
                ("Temporal Forces", SV),
                ("Paldean Fates", SV),
                ("Paradox Rift", SV),
                ("151", SV),
                ("Obsidian Flames", SV),
                ("Paldea Evolved", SV),
                ("Crown Zenith", SWSH),
                ("Silver Tempest", SWSH),
                ("Lost Origin", SWSH),
                ("Pokemon GO", SWSH),
                ("Astral Radiance", SWSH),
                ("Brilliant Stars", SWSH),
                ("Fusion Strike", SWSH),
                ("Celebrations", SWSH),
                ("Evolving Skies", SWSH),
                ("Chilling Reign", SWSH),
                ("Battle Styles", SWSH),
                ("Shining Fates", SWSH),
                ("Vivid Voltage", SWSH),
                ("Champion's Path", SWSH),
                ("Darkness Ablaze", SWSH),
                ("Rebel Clash", SWSH),
                ("Cosmic Eclipse", SM),
                ("Hidden Fates", SM),
                ("Unified Minds", SM),
                ("Unbroken Bonds", SM),
                ("Team Up", SM),
                ("Lost Thunder", SM),
                ("Dragon Majesty", SM),
                ("Celestial Storm", SM),
                ("Forbidden Light", SM),
                ("Ultra Prism", SM),
                ("Crimson Invasion", SM),
                ("Shining Legends", SM),
                ("Burning Shadows", SM),
                ("Guardians Rising", SM),
                ("Evolutions", XY),
                ("Steam Siege", XY),
                ("Fates Collide", XY),
                ("Generations", XY),
                ("BREAKpoint", XY),
                ("BREAKthrough", XY),
                ("Ancient Origins", XY),
                ("Roaring Skies", XY),
                ("Primal Clash", XY),
                ("Phantom Forces", XY),
                ("Furious Fists", XY),
                ("Flashfire", XY),
                ("Legendary Treasures", BW),
                ("Plasma Blast", BW),
                ("Plasma Freeze", BW),
                ("Plasma Storm", BW),
                ("Boundaries Crossed", BW),
                ("Dragons Exalted", BW),
                ("Dark Explorers", BW),
                ("Next Destinies", BW),
                ("Noble Victories", BW),
                ("Emerging Powers", BW),
                ("Call of Legends", HGSS),
                ("Triumphant", HGSS),
                ("Undaunted", HGSS),
                ("Unleashed", HGSS),
                ("Arceus", PLAT),
                ("Supreme Victors", PLAT),
                ("Rising Rivals", PLAT),
                ("Stormfront", DP),
                ("Legends Awakened", DP),
                ("Majestic Dawn", DP),
                ("Great Encounters", DP),
                ("Secret Wonders", DP),
                ("Mysterious Treasures", DP),
                ("Power Keepers", EX),
                ("Dragon Frontiers", EX),
                ("Crystal Guardians", EX),
                ("Holon Phantoms", EX),
                ("Legend Maker", EX),
                ("Delta Species", EX),
                ("Unseen Forces", EX),
                ("Emerald", EX),
                ("Deoxys", EX),
                ("Team Rocket Returns", EX),
                ("FireRed & LeafGreen", EX),
                ("Hidden Legends", EX),
                ("Team Magma vs Team Aqua", EX),
                ("Ruby & Sapphire", EX),
                ("Skyridge", ECARD),
                ("Aquapolis", ECARD),
                ("Expedition", ECARD),
                ("Legendary Collection", BASE),
                ("Neo Destiny", NEO),
                ("Neo Revelation", NEO),
                ("Neo Discovery", NEO),
                ("Neo Genesis", NEO),
                ("Gym Challenge", GYM),
                ("Gym Heroes", GYM),
                ("Team Rocket", BASE),
                ("Base Set 2", BASE),
                ("Fossil", BASE),
                ("Jungle", BASE),
                ("Base Set", BASE),
            ]),
            priority: [SV, SWSH, SM, XY, BW, HGSS, PLAT, DP, EX, ECARD, NEO, GYM, BASE]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// `needle` occurs in `haystack` bounded by non-alphanumerics, so "EX" does
/// not match inside "Next".
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

// ---------------------------------------------------------------------------
// ExpansionClassifier
// ---------------------------------------------------------------------------

/// Immutable classifier compiled from [`ClassifierRules`].
#[derive(Debug, Clone)]
pub struct ExpansionClassifier {
    special_codes: HashMap<String, String>,
    code_patterns: Vec<(Regex, String)>,
    /// Lowercased name to label, in rule order.
    names: Vec<(String, String)>,
    /// Position in `names` by lowercased name.
    name_index: HashMap<String, usize>,
    labels: Vec<String>,
    priority: Vec<String>,
}

impl Default for ExpansionClassifier {
    fn default() -> Self {
        Self::new(ClassifierRules::default())
    }
}

impl ExpansionClassifier {
    /// Compile `rules`. Patterns that fail to compile are logged and skipped.
    pub fn new(rules: ClassifierRules) -> Self {
        let code_patterns = rules
            .code_patterns
            .into_iter()
            .filter_map(|(pattern, label)| {
                match Regex::new(&format!("(?i){pattern}")) {
                    Ok(re) => Some((re, label)),
                    Err(e) => {
                        tracing::warn!(pattern, error = %e, "Skipping invalid expansion pattern");
                        None
                    }
                }
            })
            .collect();

        let mut labels: Vec<String> = rules.priority.clone();
        for (_, label) in rules.special_codes.iter().chain(rules.names.iter()) {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }
        // Longest first so "Sword & Shield Promos" does not stop at a shorter label.
        labels.sort_by_key(|l| std::cmp::Reverse(l.len()));

        let names: Vec<(String, String)> = rules
            .names
            .into_iter()
            .map(|(name, label)| (name.to_lowercase(), label))
            .collect();
        let mut name_index = HashMap::with_capacity(names.len());
        for (i, (name, _)) in names.iter().enumerate() {
            name_index.entry(name.clone()).or_insert(i);
        }

        Self {
            special_codes: rules
                .special_codes
                .into_iter()
                .map(|(code, label)| (code.to_uppercase(), label))
                .collect(),
            code_patterns,
            names,
            name_index,
            labels,
            priority: rules.priority,
        }
    }

    /// Label for a set given its code and name. Always returns something.
    pub fn classify(&self, code: Option<&str>, name: &str) -> String {
        if let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) {
            if let Some(label) = self.special_codes.get(&code.to_uppercase()) {
                return label.clone();
            }
            if let Some((_, label)) = self.code_patterns.iter().find(|(re, _)| re.is_match(code)) {
                return label.clone();
            }
        }
        self.classify_name(name)
            .unwrap_or_else(|| FALLBACK_LABEL.to_string())
    }

    pub fn classify_set(&self, set: &PokemonSet) -> String {
        self.classify(set.code.as_deref(), &set.name)
    }

    fn classify_name(&self, name: &str) -> Option<String> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return None;
        }
        if let Some(&i) = self.name_index.get(&name) {
            return Some(self.names[i].1.clone());
        }
        if let Some(label) = self
            .labels
            .iter()
            .find(|l| contains_phrase(&name, &l.to_lowercase()))
        {
            return Some(label.clone());
        }
        self.names
            .iter()
            .find(|(key, _)| name.contains(key.as_str()) || key.contains(name.as_str()))
            .map(|(_, label)| label.clone())
    }

    /// Bucket sets by label.
    ///
    /// Within a group sets are newest first (undated last). Groups follow the
    /// priority list, then the order labels were first seen.
    pub fn group(&self, sets: &[PokemonSet]) -> Vec<ExpansionGroup> {
        let mut order: Vec<String> = Vec::new();
        let mut buckets: HashMap<String, Vec<PokemonSet>> = HashMap::new();

        for set in sets {
            let label = set
                .series_expansion
                .clone()
                .unwrap_or_else(|| self.classify_set(set));
            if !buckets.contains_key(&label) {
                order.push(label.clone());
            }
            buckets.entry(label).or_default().push(set.clone());
        }

        let mut ordered: Vec<String> = self
            .priority
            .iter()
            .filter(|p| buckets.contains_key(*p))
            .cloned()
            .collect();
        ordered.extend(order.into_iter().filter(|l| !self.priority.contains(l)));

        ordered
            .into_iter()
            .filter_map(|label| {
                let mut sets = buckets.remove(&label)?;
                sets.sort_by(|a, b| b.release_date.cmp(&a.release_date));
                Some(ExpansionGroup { label, sets })
            })
            .collect()
    }
}
