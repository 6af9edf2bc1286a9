//! Per-date manual overrides and their resolution against the entry pools.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::data::{AlmanacEntry, DataError, ListSide};

pub(crate) const DEFAULT_OVERRIDES_DATA: &str = include_str!("../assets/data/overrides.json");

/// Index namespace for synthesized yi-side entries.
const YI_CUSTOM_BASE: u32 = 1_000_000;
/// Index namespace for synthesized ji-side entries.
const JI_CUSTOM_BASE: u32 = 2_000_000;

/// Bilingual title pair for a fixed override entry. Either side may be
/// blank; resolution falls back to the other before trimming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OverrideText {
    #[serde(default)]
    pub zh: String,
    #[serde(default)]
    pub en: String,
}

/// Fixed guidance for one calendar date. `locked` days refuse every skill
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DayOverride {
    #[serde(default)]
    pub yi: Vec<OverrideText>,
    #[serde(default)]
    pub ji: Vec<OverrideText>,
    #[serde(default)]
    pub locked: bool,
}

impl DayOverride {
    /// The override texts for one list side.
    #[must_use]
    pub fn side(&self, side: ListSide) -> &[OverrideText] {
        match side {
            ListSide::Yi => &self.yi,
            ListSide::Ji => &self.ji,
        }
    }
}

/// Read-only table of per-date overrides, keyed by `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct OverrideTable {
    pub days: BTreeMap<String, DayOverride>,
}

impl OverrideTable {
    /// Create an empty table (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the override table from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a valid table.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load the override table from the assets compiled into the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_OVERRIDES_DATA).unwrap_or_default()
    }

    /// The override configuration for a date key, if any.
    #[must_use]
    pub fn day(&self, date_key: &str) -> Option<&DayOverride> {
        self.days.get(date_key)
    }

    /// Whether skill resolutions are forbidden for the date.
    #[must_use]
    pub fn is_locked(&self, date_key: &str) -> bool {
        self.day(date_key).is_some_and(|day| day.locked)
    }
}

/// Process-lifetime override table backed by the compiled-in assets.
#[must_use]
pub fn override_table() -> &'static OverrideTable {
    static TABLE: OnceLock<OverrideTable> = OnceLock::new();
    TABLE.get_or_init(OverrideTable::load_from_static)
}

/// Where a resolved override entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOrigin {
    /// Matched the side's own pool; counts against the specific quota.
    Specific,
    /// Matched the shared pool; counts against the common quota.
    Common,
    /// No pool match; synthesized with a namespaced index.
    Custom,
}

/// One override entry after matching, tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOverride {
    pub entry: AlmanacEntry,
    pub origin: OverrideOrigin,
}

/// Match each override text against the specific pool, then the common pool;
/// synthesize a custom entry when neither matches. Output order follows the
/// override input order.
#[must_use]
pub fn resolve_override_entries(
    overrides: &[OverrideText],
    specific_pool: &[AlmanacEntry],
    common_pool: &[AlmanacEntry],
    date_key: &str,
    side: ListSide,
) -> Vec<ResolvedOverride> {
    overrides
        .iter()
        .enumerate()
        .map(|(position, text)| {
            let zh = normalized_title(&text.zh, &text.en);
            let en = normalized_title(&text.en, &text.zh);
            let matches = |entry: &&AlmanacEntry| {
                entry.title == zh || entry.title == en || entry.title_en == zh || entry.title_en == en
            };

            if let Some(found) = specific_pool.iter().find(matches) {
                return ResolvedOverride {
                    entry: found.clone(),
                    origin: OverrideOrigin::Specific,
                };
            }
            if let Some(found) = common_pool.iter().find(matches) {
                return ResolvedOverride {
                    entry: found.clone(),
                    origin: OverrideOrigin::Common,
                };
            }
            ResolvedOverride {
                entry: custom_entry(&zh, &en, date_key, side, position),
                origin: OverrideOrigin::Custom,
            }
        })
        .collect()
}

fn normalized_title(primary: &str, secondary: &str) -> String {
    let value = if primary.trim().is_empty() {
        secondary
    } else {
        primary
    };
    value.trim().to_string()
}

/// Synthesize an entry for an override that matched no pool. The index lives
/// in a per-side namespace far above the real pools; the position salt keeps
/// repeated identical texts distinct within one day.
fn custom_entry(
    zh: &str,
    en: &str,
    date_key: &str,
    side: ListSide,
    position: usize,
) -> AlmanacEntry {
    let base = match side {
        ListSide::Yi => YI_CUSTOM_BASE,
        ListSide::Ji => JI_CUSTOM_BASE,
    };
    let key = format!("{date_key}-{}-{zh}-{en}-{position}", side.as_str());
    AlmanacEntry {
        index: base + poly31_hash(&key),
        title: zh.to_string(),
        title_en: en.to_string(),
    }
}

/// 31-multiplier rolling hash over UTF-16 code units, folded to wrapping
/// 32-bit and taken absolute.
fn poly31_hash(value: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in value.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    hash.unsigned_abs()
}
