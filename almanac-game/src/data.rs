//! Static almanac content: bilingual entry pools and their JSON loading.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

pub(crate) const DEFAULT_ENTRY_DATA: &str = include_str!("../assets/data/entries.json");

/// Display language for entry and skill text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

/// Which of the two guidance lists an entry sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListSide {
    Yi,
    Ji,
}

impl ListSide {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yi => "yi",
            Self::Ji => "ji",
        }
    }

    /// The opposite list.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Yi => Self::Ji,
            Self::Ji => Self::Yi,
        }
    }
}

impl fmt::Display for ListSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListSide {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yi" => Ok(Self::Yi),
            "ji" => Ok(Self::Ji),
            _ => Err(()),
        }
    }
}

/// A single guidance item. Pool entries are read-only reference data; custom
/// entries are synthesized per generation call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlmanacEntry {
    pub index: u32,
    pub title: String,
    pub title_en: String,
}

impl AlmanacEntry {
    /// The title in the requested language.
    #[must_use]
    pub fn title_for(&self, language: Language) -> &str {
        match language {
            Language::Zh => &self.title,
            Language::En => &self.title_en,
        }
    }
}

/// Errors raised while loading static content tables.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("malformed almanac data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Container for the three entry pools.
///
/// Indices are unique within each pool, and the pools occupy disjoint ranges
/// well below the custom-entry bases (see `overrides`), so an index also
/// identifies an entry across the whole data set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AlmanacData {
    pub yi_entries: Vec<AlmanacEntry>,
    pub ji_entries: Vec<AlmanacEntry>,
    pub common_entries: Vec<AlmanacEntry>,
}

impl AlmanacData {
    /// Create empty pools (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the entry pools from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into valid entry pools.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load the entry pools from the assets compiled into the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_ENTRY_DATA).unwrap_or_default()
    }

    /// The specific pool feeding the given list side.
    #[must_use]
    pub fn specific_pool(&self, side: ListSide) -> &[AlmanacEntry] {
        match side {
            ListSide::Yi => &self.yi_entries,
            ListSide::Ji => &self.ji_entries,
        }
    }
}

/// Process-lifetime entry pools backed by the compiled-in assets.
#[must_use]
pub fn entry_data() -> &'static AlmanacData {
    static DATA: OnceLock<AlmanacData> = OnceLock::new();
    DATA.get_or_init(AlmanacData::load_from_static)
}
