//! Skill catalog and the resolution algebra that rewrites a day's guidance.

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::data::{AlmanacData, AlmanacEntry, DataError, Language, ListSide};
use crate::guidance::GuidanceSet;
use crate::sampler::sample_entries;

pub(crate) const DEFAULT_SKILLS_DATA: &str = include_str!("../assets/data/skills.json");

/// How many skills one activation offers.
pub const SKILLS_TO_DRAW: usize = 3;
/// How many entries a patient gambit destroys at most.
pub const DESTROY_TARGET_COUNT: usize = 4;
/// How many replacement candidates a reroll offers.
pub const REROLL_OPTION_COUNT: usize = 3;

const FLOW_TITLE: &str = "顺其自然";
const FLOW_TITLE_EN: &str = "Go with the flow";
/// Fallback index when the sentinel is missing from the yi pool.
const FLOW_FALLBACK_INDEX: u32 = 9_999_001;

/// Stable identifiers for the nine operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkillId {
    InvertAll,
    AllToJi,
    AllToYi,
    RerollOne,
    RemoveOne,
    WipeAll,
    SwapSide,
    AllIn,
    DestroyFour,
}

impl SkillId {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvertAll => "invert-all",
            Self::AllToJi => "all-to-ji",
            Self::AllToYi => "all-to-yi",
            Self::RerollOne => "reroll-one",
            Self::RemoveOne => "remove-one",
            Self::WipeAll => "wipe-all",
            Self::SwapSide => "swap-side",
            Self::AllIn => "all-in",
            Self::DestroyFour => "destroy-four",
        }
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invert-all" => Ok(Self::InvertAll),
            "all-to-ji" => Ok(Self::AllToJi),
            "all-to-yi" => Ok(Self::AllToYi),
            "reroll-one" => Ok(Self::RerollOne),
            "remove-one" => Ok(Self::RemoveOne),
            "wipe-all" => Ok(Self::WipeAll),
            "swap-side" => Ok(Self::SwapSide),
            "all-in" => Ok(Self::AllIn),
            "destroy-four" => Ok(Self::DestroyFour),
            _ => Err(()),
        }
    }
}

/// A catalog entry: identity plus bilingual display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: SkillId,
    pub badge: String,
    pub name: String,
    pub name_en: String,
    pub description: String,
    pub description_en: String,
}

impl Skill {
    /// The display name in the requested language.
    #[must_use]
    pub fn name_for(&self, language: Language) -> &str {
        match language {
            Language::Zh => &self.name,
            Language::En => &self.name_en,
        }
    }

    /// The description in the requested language.
    #[must_use]
    pub fn description_for(&self, language: Language) -> &str {
        match language {
            Language::Zh => &self.description,
            Language::En => &self.description_en,
        }
    }
}

/// The fixed nine-skill library, loaded once and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SkillCatalog {
    pub skills: Vec<Skill>,
}

impl SkillCatalog {
    /// Create an empty catalog (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the catalog from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a valid catalog.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load the catalog from the assets compiled into the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_SKILLS_DATA).unwrap_or_default()
    }

    /// Look up one skill by identity.
    #[must_use]
    pub fn get(&self, id: SkillId) -> Option<&Skill> {
        self.skills.iter().find(|skill| skill.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// Process-lifetime skill catalog backed by the compiled-in assets.
#[must_use]
pub fn skill_catalog() -> &'static SkillCatalog {
    static CATALOG: OnceLock<SkillCatalog> = OnceLock::new();
    CATALOG.get_or_init(SkillCatalog::load_from_static)
}

/// Reference to one entry of a guidance set at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryReference {
    pub list: ListSide,
    pub index: u32,
}

/// The user's chosen operation with its parameters. This is the unit of
/// shareable state; the wire format is the tagged JSON the fragment codec
/// percent-escapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "kebab-case")]
pub enum SkillResolution {
    InvertAll,
    AllToJi,
    AllToYi,
    #[serde(rename_all = "camelCase")]
    RerollOne {
        list: ListSide,
        target_index: u32,
        replacement_index: u32,
    },
    #[serde(rename_all = "camelCase")]
    RemoveOne { list: ListSide, target_index: u32 },
    WipeAll,
    #[serde(rename_all = "camelCase")]
    SwapSide { list: ListSide, target_index: u32 },
    #[serde(rename_all = "camelCase")]
    AllIn { list: ListSide, target_index: u32 },
    DestroyFour {
        removed: SmallVec<[EntryReference; 4]>,
    },
}

impl SkillResolution {
    /// Which catalog skill produced this resolution.
    #[must_use]
    pub const fn skill_id(&self) -> SkillId {
        match self {
            Self::InvertAll => SkillId::InvertAll,
            Self::AllToJi => SkillId::AllToJi,
            Self::AllToYi => SkillId::AllToYi,
            Self::RerollOne { .. } => SkillId::RerollOne,
            Self::RemoveOne { .. } => SkillId::RemoveOne,
            Self::WipeAll => SkillId::WipeAll,
            Self::SwapSide { .. } => SkillId::SwapSide,
            Self::AllIn { .. } => SkillId::AllIn,
            Self::DestroyFour { .. } => SkillId::DestroyFour,
        }
    }
}

/// Apply one resolution to a guidance set. Pure: the input is never
/// mutated, and a resolution referencing entries that no longer exist
/// degrades to a no-op instead of failing.
#[must_use]
pub fn apply_resolution(
    base: &GuidanceSet,
    resolution: &SkillResolution,
    data: &AlmanacData,
) -> GuidanceSet {
    match resolution {
        SkillResolution::InvertAll => GuidanceSet {
            yi: base.ji.clone(),
            ji: base.yi.clone(),
        },
        SkillResolution::AllToJi => GuidanceSet {
            yi: Vec::new(),
            ji: [base.ji.clone(), base.yi.clone()].concat(),
        },
        SkillResolution::AllToYi => GuidanceSet {
            yi: [base.yi.clone(), base.ji.clone()].concat(),
            ji: Vec::new(),
        },
        SkillResolution::RemoveOne { list, target_index } => {
            remove_by_index(base, *list, *target_index)
        }
        SkillResolution::SwapSide { list, target_index } => {
            move_across(base, *list, *target_index)
        }
        SkillResolution::AllIn { list, target_index } => keep_only(base, *list, *target_index),
        SkillResolution::RerollOne {
            list,
            target_index,
            replacement_index,
        } => reroll_entry(base, *list, *target_index, *replacement_index, data),
        SkillResolution::DestroyFour { removed } => remove_references(base, removed),
        SkillResolution::WipeAll => GuidanceSet {
            yi: vec![flow_entry(data)],
            ji: Vec::new(),
        },
    }
}

/// The sentinel left behind by a wipe: the yi-pool "go with the flow"
/// entry, or a fixed stand-in when the pool lacks it.
#[must_use]
pub fn flow_entry(data: &AlmanacData) -> AlmanacEntry {
    data.yi_entries
        .iter()
        .find(|entry| entry.title == FLOW_TITLE)
        .cloned()
        .unwrap_or_else(|| AlmanacEntry {
            index: FLOW_FALLBACK_INDEX,
            title: FLOW_TITLE.to_string(),
            title_en: FLOW_TITLE_EN.to_string(),
        })
}

fn remove_by_index(base: &GuidanceSet, list: ListSide, target_index: u32) -> GuidanceSet {
    let keep = |entries: &[AlmanacEntry]| {
        entries
            .iter()
            .filter(|entry| entry.index != target_index)
            .cloned()
            .collect()
    };
    match list {
        ListSide::Yi => GuidanceSet {
            yi: keep(&base.yi),
            ji: base.ji.clone(),
        },
        ListSide::Ji => GuidanceSet {
            yi: base.yi.clone(),
            ji: keep(&base.ji),
        },
    }
}

fn move_across(base: &GuidanceSet, list: ListSide, target_index: u32) -> GuidanceSet {
    let Some(entry) = base.find(list, target_index).cloned() else {
        return base.clone();
    };
    let trimmed = remove_by_index(base, list, target_index);
    match list {
        ListSide::Yi => {
            let mut ji = trimmed.ji;
            ji.push(entry);
            GuidanceSet { yi: trimmed.yi, ji }
        }
        ListSide::Ji => {
            let mut yi = trimmed.yi;
            yi.push(entry);
            GuidanceSet { yi, ji: trimmed.ji }
        }
    }
}

fn keep_only(base: &GuidanceSet, list: ListSide, target_index: u32) -> GuidanceSet {
    let Some(entry) = base.find(list, target_index).cloned() else {
        return base.clone();
    };
    match list {
        ListSide::Yi => GuidanceSet {
            yi: vec![entry],
            ji: Vec::new(),
        },
        ListSide::Ji => GuidanceSet {
            yi: Vec::new(),
            ji: vec![entry],
        },
    }
}

fn reroll_entry(
    base: &GuidanceSet,
    list: ListSide,
    target_index: u32,
    replacement_index: u32,
    data: &AlmanacData,
) -> GuidanceSet {
    let pool = data.specific_pool(list);
    let Some(replacement) = pool.iter().find(|entry| entry.index == replacement_index) else {
        return base.clone();
    };
    let swap = |entries: &[AlmanacEntry]| {
        entries
            .iter()
            .map(|entry| {
                if entry.index == target_index {
                    replacement.clone()
                } else {
                    entry.clone()
                }
            })
            .collect()
    };
    match list {
        ListSide::Yi => GuidanceSet {
            yi: swap(&base.yi),
            ji: base.ji.clone(),
        },
        ListSide::Ji => GuidanceSet {
            yi: base.yi.clone(),
            ji: swap(&base.ji),
        },
    }
}

fn remove_references(base: &GuidanceSet, refs: &[EntryReference]) -> GuidanceSet {
    let mut yi_delete = HashSet::new();
    let mut ji_delete = HashSet::new();
    for reference in refs {
        match reference.list {
            ListSide::Yi => yi_delete.insert(reference.index),
            ListSide::Ji => ji_delete.insert(reference.index),
        };
    }
    GuidanceSet {
        yi: base
            .yi
            .iter()
            .filter(|entry| !yi_delete.contains(&entry.index))
            .cloned()
            .collect(),
        ji: base
            .ji
            .iter()
            .filter(|entry| !ji_delete.contains(&entry.index))
            .cloned()
            .collect(),
    }
}

/// One selectable entry during the interactive flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTarget {
    pub list: ListSide,
    pub entry: AlmanacEntry,
}

/// Offer `count` skills from the catalog, without replacement. Interactive
/// candidate draws are intentionally unseeded; only the resolution they
/// produce is replayable.
pub fn draw_random_skills<R>(catalog: &SkillCatalog, count: usize, rng: &mut R) -> Vec<Skill>
where
    R: Rng + ?Sized,
{
    let mut working = catalog.skills.clone();
    let mut selections = Vec::with_capacity(count.min(working.len()));
    while selections.len() < count && !working.is_empty() {
        let idx = rng.gen_range(0..working.len());
        selections.push(working.remove(idx));
    }
    selections
}

/// Random destruction targets: a subset of size `min(count, total)` drawn
/// from the union of both lists.
pub fn pick_destroy_targets<R>(
    guidance: &GuidanceSet,
    count: usize,
    rng: &mut R,
) -> Vec<EntryTarget>
where
    R: Rng + ?Sized,
{
    let mut working: Vec<EntryTarget> = guidance
        .yi
        .iter()
        .map(|entry| EntryTarget {
            list: ListSide::Yi,
            entry: entry.clone(),
        })
        .chain(guidance.ji.iter().map(|entry| EntryTarget {
            list: ListSide::Ji,
            entry: entry.clone(),
        }))
        .collect();
    let wanted = count.min(working.len());
    let mut selections = Vec::with_capacity(wanted);
    while selections.len() < wanted {
        let idx = rng.gen_range(0..working.len());
        selections.push(working.remove(idx));
    }
    selections
}

/// Replacement candidates for a reroll: drawn from the target list's own
/// pool, excluding everything already on display and the target itself. An
/// empty result aborts the flow before any resolution exists.
pub fn reroll_options<R>(
    target: &EntryTarget,
    guidance: &GuidanceSet,
    data: &AlmanacData,
    rng: &mut R,
) -> Vec<AlmanacEntry>
where
    R: Rng + ?Sized,
{
    let mut exclude = guidance.all_indices();
    exclude.insert(target.entry.index);
    sample_entries(
        data.specific_pool(target.list),
        REROLL_OPTION_COUNT,
        rng,
        &exclude,
    )
}
