//! Skill Almanac Engine
//!
//! Platform-agnostic core logic for the Skill Almanac, a novelty calendar
//! that deals every date a deterministic set of "auspicious" and "avoid"
//! guidance entries and lets the user rewrite the day with one of nine
//! skills. This crate provides generation, the resolution algebra, and the
//! shareable-state codec without UI or platform-specific dependencies.

pub mod data;
pub mod guidance;
pub mod hash_state;
pub mod overrides;
pub mod sampler;
pub mod seed;
pub mod session;
pub mod skills;

// Re-export commonly used types
pub use data::{AlmanacData, AlmanacEntry, DataError, Language, ListSide, entry_data};
pub use guidance::{GuidanceSet, generate_guidance};
pub use hash_state::{
    HashState, build_fragment, decode_resolution, encode_resolution, parse_fragment,
};
pub use overrides::{
    DayOverride, OverrideOrigin, OverrideTable, OverrideText, ResolvedOverride, override_table,
    resolve_override_entries,
};
pub use sampler::sample_entries;
pub use seed::{date_key, day_rng, day_seed, parse_date_key};
pub use session::{Advisory, AlmanacSession, EntryAction, FlowEvent, SkillPhase};
pub use skills::{
    DESTROY_TARGET_COUNT, EntryReference, EntryTarget, REROLL_OPTION_COUNT, SKILLS_TO_DRAW, Skill,
    SkillCatalog, SkillId, SkillResolution, apply_resolution, draw_random_skills, flow_entry,
    pick_destroy_targets, reroll_options, skill_catalog,
};

use chrono::NaiveDate;

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait AlmanacDataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the three entry pools from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the entry pools cannot be loaded.
    fn load_entry_data(&self) -> Result<AlmanacData, Self::Error>;

    /// Load the per-date override table
    ///
    /// # Errors
    ///
    /// Returns an error if the override table cannot be loaded.
    fn load_override_table(&self) -> Result<OverrideTable, Self::Error>;

    /// Load the skill catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the skill catalog cannot be loaded.
    fn load_skill_catalog(&self) -> Result<SkillCatalog, Self::Error>;
}

/// Loader backed by the JSON assets compiled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAssets;

impl AlmanacDataLoader for StaticAssets {
    type Error = DataError;

    fn load_entry_data(&self) -> Result<AlmanacData, Self::Error> {
        AlmanacData::from_json(data::DEFAULT_ENTRY_DATA)
    }

    fn load_override_table(&self) -> Result<OverrideTable, Self::Error> {
        OverrideTable::from_json(overrides::DEFAULT_OVERRIDES_DATA)
    }

    fn load_skill_catalog(&self) -> Result<SkillCatalog, Self::Error> {
        SkillCatalog::from_json(skills::DEFAULT_SKILLS_DATA)
    }
}

/// The loaded almanac: entry pools, override table, and skill catalog,
/// plus the four operations the presentation layer calls into.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Almanac {
    data: AlmanacData,
    overrides: OverrideTable,
    skills: SkillCatalog,
}

impl Almanac {
    /// Assemble an almanac from already-loaded tables.
    #[must_use]
    pub const fn new(data: AlmanacData, overrides: OverrideTable, skills: SkillCatalog) -> Self {
        Self {
            data,
            overrides,
            skills,
        }
    }

    /// Load every table through the given loader.
    ///
    /// # Errors
    ///
    /// Returns an error if any table cannot be loaded.
    pub fn load<L>(loader: &L) -> Result<Self, anyhow::Error>
    where
        L: AlmanacDataLoader,
        L::Error: Into<anyhow::Error>,
    {
        let data = loader.load_entry_data().map_err(Into::into)?;
        let overrides = loader.load_override_table().map_err(Into::into)?;
        let skills = loader.load_skill_catalog().map_err(Into::into)?;
        Ok(Self::new(data, overrides, skills))
    }

    /// Assemble an almanac from the assets compiled into the crate.
    #[must_use]
    pub fn from_static_assets() -> Self {
        Self::new(
            AlmanacData::load_from_static(),
            OverrideTable::load_from_static(),
            SkillCatalog::load_from_static(),
        )
    }

    #[must_use]
    pub const fn data(&self) -> &AlmanacData {
        &self.data
    }

    #[must_use]
    pub const fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    #[must_use]
    pub const fn skills(&self) -> &SkillCatalog {
        &self.skills
    }

    /// Look up one skill by identity.
    #[must_use]
    pub fn skill(&self, id: SkillId) -> Option<&Skill> {
        self.skills.get(id)
    }

    /// The day's guidance. Deterministic for a fixed date and data.
    #[must_use]
    pub fn generate_guidance(&self, date: NaiveDate) -> GuidanceSet {
        guidance::generate_guidance(date, &self.data, &self.overrides)
    }

    /// Apply a skill resolution to a guidance set. Pure; never fails.
    #[must_use]
    pub fn apply_resolution(
        &self,
        base: &GuidanceSet,
        resolution: &SkillResolution,
    ) -> GuidanceSet {
        skills::apply_resolution(base, resolution, &self.data)
    }

    /// Compose the addressable fragment for a date and optional resolution.
    #[must_use]
    pub fn encode_state(&self, date: NaiveDate, resolution: Option<&SkillResolution>) -> String {
        build_fragment(&date_key(date), resolution)
    }

    /// Tolerantly decode an addressable fragment.
    #[must_use]
    pub fn decode_state(&self, fragment: &str) -> HashState {
        parse_fragment(fragment)
    }

    /// Whether the override table forbids skill use on the date.
    #[must_use]
    pub fn is_locked(&self, date: NaiveDate) -> bool {
        self.overrides.is_locked(&date_key(date))
    }
}
