//! Application session: selected date, language, active resolution, and the
//! interactive skill flow as an explicit phase machine.

use chrono::NaiveDate;
use rand::Rng;
use smallvec::SmallVec;

use crate::Almanac;
use crate::data::{AlmanacEntry, Language, ListSide};
use crate::guidance::GuidanceSet;
use crate::hash_state::{build_fragment, parse_fragment};
use crate::seed::date_key;
use crate::skills::{
    DESTROY_TARGET_COUNT, EntryReference, EntryTarget, SKILLS_TO_DRAW, Skill, SkillId,
    SkillResolution, draw_random_skills, pick_destroy_targets, reroll_options,
};

/// What an entry pick will do once the user confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    Remove,
    Move,
    KeepOnly,
    Reroll,
}

/// Interaction phases of the skill overlay. Transitions happen only through
/// the session methods below.
#[derive(Debug, Clone, PartialEq)]
pub enum SkillPhase {
    Idle,
    SelectEntry {
        skill: SkillId,
        action: EntryAction,
    },
    ChooseReplacement {
        skill: SkillId,
        target: EntryTarget,
        options: Vec<AlmanacEntry>,
    },
}

/// User-facing advisories for exhausted pools. Advisory, not an error:
/// the pre-operation guidance set is always preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// No entries exist for a targeted skill to act on.
    NoEntries,
    /// Nothing left for a patient gambit to destroy.
    NoTargets,
    /// The reroll pool has no fresh candidates for this target.
    NoOptions,
}

/// Outcome of one interaction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    /// A resolution was applied; the flow is closed.
    Applied,
    /// Waiting for the user to pick an entry.
    EntryPrompt(EntryAction),
    /// Waiting for the user to pick a replacement option.
    ReplacementPrompt,
    /// The request was ignored (locked day, wrong phase, or a skill that
    /// was not offered).
    Ignored,
}

/// Owns the page-level state the original kept in ambient globals. One
/// session per view; the presentation layer holds a handle and calls in.
#[derive(Debug, Clone)]
pub struct AlmanacSession {
    almanac: Almanac,
    today: NaiveDate,
    selected: NaiveDate,
    language: Language,
    resolution: Option<SkillResolution>,
    offered: Vec<Skill>,
    phase: SkillPhase,
}

impl AlmanacSession {
    /// Start a session on the given current date.
    #[must_use]
    pub fn new(almanac: Almanac, today: NaiveDate) -> Self {
        Self {
            almanac,
            today,
            selected: today,
            language: Language::default(),
            resolution: None,
            offered: Vec::new(),
            phase: SkillPhase::Idle,
        }
    }

    /// Restore a session from an addressable fragment. A missing or
    /// malformed date falls back to today; a resolution on a locked day is
    /// dropped.
    #[must_use]
    pub fn from_fragment(almanac: Almanac, today: NaiveDate, fragment: &str) -> Self {
        let state = parse_fragment(fragment);
        let mut session = Self::new(almanac, today);
        session.selected = state.date.unwrap_or(today);
        if session.day_locked() {
            session.resolution = None;
        } else {
            session.resolution = state.resolution;
        }
        session
    }

    #[must_use]
    pub const fn today(&self) -> NaiveDate {
        self.today
    }

    #[must_use]
    pub const fn selected_date(&self) -> NaiveDate {
        self.selected
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub const fn resolution(&self) -> Option<&SkillResolution> {
        self.resolution.as_ref()
    }

    #[must_use]
    pub const fn phase(&self) -> &SkillPhase {
        &self.phase
    }

    /// The skills currently on offer, empty outside an active flow.
    #[must_use]
    pub fn offered_skills(&self) -> &[Skill] {
        &self.offered
    }

    #[must_use]
    pub const fn almanac(&self) -> &Almanac {
        &self.almanac
    }

    /// Zero-padded key for the selected date.
    #[must_use]
    pub fn date_key(&self) -> String {
        date_key(self.selected)
    }

    /// Whether the override table seals the selected day.
    #[must_use]
    pub fn day_locked(&self) -> bool {
        self.almanac.is_locked(self.selected)
    }

    /// Whether any further skill use is refused: sealed day, or a skill was
    /// already used for this selection.
    #[must_use]
    pub fn skill_locked(&self) -> bool {
        self.day_locked() || self.resolution.is_some()
    }

    /// The day's untransformed guidance. Deterministic per date.
    #[must_use]
    pub fn base_guidance(&self) -> GuidanceSet {
        self.almanac.generate_guidance(self.selected)
    }

    /// The guidance after the active resolution, if any. A sealed day shows
    /// its base guidance regardless.
    #[must_use]
    pub fn effective_guidance(&self) -> GuidanceSet {
        let base = self.base_guidance();
        match &self.resolution {
            Some(resolution) if !self.day_locked() => {
                self.almanac.apply_resolution(&base, resolution)
            }
            _ => base,
        }
    }

    /// The normalized addressable fragment for the current state: `#` when
    /// the selection is today with nothing applied, the full form otherwise.
    #[must_use]
    pub fn fragment(&self) -> String {
        if self.resolution.is_none() && self.selected == self.today {
            "#".to_string()
        } else {
            build_fragment(&self.date_key(), self.resolution.as_ref())
        }
    }

    /// Select another date. Discards the resolution and any in-progress
    /// selection phase.
    pub fn select_date(&mut self, date: NaiveDate) {
        self.resolution = None;
        self.selected = date;
        self.close_flow();
    }

    /// Switch display language. The original discards the resolution here
    /// so a shared link never outlives a language flip.
    pub fn set_language(&mut self, language: Language) {
        if self.language != language {
            self.language = language;
            self.resolution = None;
            self.close_flow();
        }
    }

    /// Apply a resolution directly, e.g. one decoded from a shared link.
    /// Returns false when the day refuses it.
    pub fn apply_resolution(&mut self, resolution: SkillResolution) -> bool {
        if self.skill_locked() {
            log::warn!(
                "skill resolution {} suppressed for locked day {}",
                resolution.skill_id(),
                self.date_key()
            );
            return false;
        }
        self.resolution = Some(resolution);
        self.close_flow();
        true
    }

    /// Drop the active resolution without touching the date.
    pub fn clear_resolution(&mut self) {
        self.resolution = None;
    }

    /// Open the skill flow by drawing the day's offer. No-op on a locked
    /// day. The draw is unseeded on purpose: only the final resolution is
    /// replayable, never the candidate sampling.
    pub fn activate_skills<R>(&mut self, rng: &mut R) -> bool
    where
        R: Rng + ?Sized,
    {
        if self.skill_locked() {
            return false;
        }
        self.offered = draw_random_skills(self.almanac.skills(), SKILLS_TO_DRAW, rng);
        self.phase = SkillPhase::Idle;
        true
    }

    /// Abandon the flow; an unapplied selection phase simply evaporates.
    pub fn close_flow(&mut self) {
        self.offered.clear();
        self.phase = SkillPhase::Idle;
    }

    /// The user picked one of the offered skill cards.
    ///
    /// # Errors
    ///
    /// Returns an [`Advisory`] when the chosen skill has nothing to act on.
    pub fn choose_skill<R>(&mut self, id: SkillId, rng: &mut R) -> Result<FlowEvent, Advisory>
    where
        R: Rng + ?Sized,
    {
        if self.skill_locked()
            || self.phase != SkillPhase::Idle
            || !self.offered.iter().any(|skill| skill.id == id)
        {
            return Ok(FlowEvent::Ignored);
        }
        match id {
            SkillId::InvertAll => self.apply_and_close(SkillResolution::InvertAll),
            SkillId::AllToJi => self.apply_and_close(SkillResolution::AllToJi),
            SkillId::AllToYi => self.apply_and_close(SkillResolution::AllToYi),
            SkillId::WipeAll => self.apply_and_close(SkillResolution::WipeAll),
            SkillId::RemoveOne => self.prompt_for_entry(id, EntryAction::Remove),
            SkillId::SwapSide => self.prompt_for_entry(id, EntryAction::Move),
            SkillId::AllIn => self.prompt_for_entry(id, EntryAction::KeepOnly),
            SkillId::RerollOne => self.prompt_for_entry(id, EntryAction::Reroll),
            SkillId::DestroyFour => {
                let guidance = self.effective_guidance();
                let targets = pick_destroy_targets(&guidance, DESTROY_TARGET_COUNT, rng);
                if targets.is_empty() {
                    return Err(Advisory::NoTargets);
                }
                let removed: SmallVec<[EntryReference; 4]> = targets
                    .iter()
                    .map(|target| EntryReference {
                        list: target.list,
                        index: target.entry.index,
                    })
                    .collect();
                self.apply_and_close(SkillResolution::DestroyFour { removed })
            }
        }
    }

    /// The user picked an entry while a skill waits for its target.
    ///
    /// # Errors
    ///
    /// Returns [`Advisory::NoOptions`] when a reroll finds no fresh
    /// candidates; the flow stays on the entry prompt.
    pub fn select_entry<R>(
        &mut self,
        list: ListSide,
        index: u32,
        rng: &mut R,
    ) -> Result<FlowEvent, Advisory>
    where
        R: Rng + ?Sized,
    {
        let (skill, action) = match &self.phase {
            SkillPhase::SelectEntry { skill, action } => (*skill, *action),
            _ => return Ok(FlowEvent::Ignored),
        };
        let guidance = self.effective_guidance();
        let Some(entry) = guidance.find(list, index).cloned() else {
            return Ok(FlowEvent::Ignored);
        };
        match action {
            EntryAction::Remove => self.apply_and_close(SkillResolution::RemoveOne {
                list,
                target_index: index,
            }),
            EntryAction::Move => self.apply_and_close(SkillResolution::SwapSide {
                list,
                target_index: index,
            }),
            EntryAction::KeepOnly => self.apply_and_close(SkillResolution::AllIn {
                list,
                target_index: index,
            }),
            EntryAction::Reroll => {
                let target = EntryTarget { list, entry };
                let options = reroll_options(&target, &guidance, self.almanac.data(), rng);
                if options.is_empty() {
                    return Err(Advisory::NoOptions);
                }
                self.phase = SkillPhase::ChooseReplacement {
                    skill,
                    target,
                    options,
                };
                Ok(FlowEvent::ReplacementPrompt)
            }
        }
    }

    /// The user picked one of the offered replacement entries.
    pub fn choose_replacement(&mut self, replacement_index: u32) -> FlowEvent {
        let (list, target_index) = match &self.phase {
            SkillPhase::ChooseReplacement {
                target, options, ..
            } => {
                if !options.iter().any(|entry| entry.index == replacement_index) {
                    return FlowEvent::Ignored;
                }
                (target.list, target.entry.index)
            }
            _ => return FlowEvent::Ignored,
        };
        let resolution = SkillResolution::RerollOne {
            list,
            target_index,
            replacement_index,
        };
        match self.apply_and_close(resolution) {
            Ok(event) => event,
            Err(_) => FlowEvent::Ignored,
        }
    }

    fn prompt_for_entry(
        &mut self,
        skill: SkillId,
        action: EntryAction,
    ) -> Result<FlowEvent, Advisory> {
        if self.effective_guidance().is_empty() {
            self.phase = SkillPhase::Idle;
            return Err(Advisory::NoEntries);
        }
        self.phase = SkillPhase::SelectEntry { skill, action };
        Ok(FlowEvent::EntryPrompt(action))
    }

    fn apply_and_close(&mut self, resolution: SkillResolution) -> Result<FlowEvent, Advisory> {
        if self.apply_resolution(resolution) {
            Ok(FlowEvent::Applied)
        } else {
            Ok(FlowEvent::Ignored)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AlmanacData;
    use crate::overrides::OverrideTable;
    use crate::skills::SkillCatalog;
    use rand::rngs::mock::StepRng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn static_session(today: NaiveDate) -> AlmanacSession {
        AlmanacSession::new(Almanac::from_static_assets(), today)
    }

    fn catalog_of(ids: &[SkillId]) -> SkillCatalog {
        let full = Almanac::from_static_assets();
        SkillCatalog {
            skills: ids
                .iter()
                .map(|id| full.skills().get(*id).unwrap().clone())
                .collect(),
        }
    }

    #[test]
    fn fragment_normalizes_today_without_resolution() {
        let today = date(2025, 1, 1);
        let mut session = static_session(today);
        assert_eq!(session.fragment(), "#");

        session.select_date(date(2025, 3, 5));
        assert_eq!(session.fragment(), "#2025-03-05");

        session.select_date(today);
        assert_eq!(session.fragment(), "#");
    }

    #[test]
    fn applying_a_resolution_extends_the_fragment() {
        let mut session = static_session(date(2025, 1, 1));
        assert!(session.apply_resolution(SkillResolution::InvertAll));
        assert!(session.fragment().starts_with("#2025-01-01|skill="));

        let restored = AlmanacSession::from_fragment(
            Almanac::from_static_assets(),
            date(2025, 1, 1),
            &session.fragment(),
        );
        assert_eq!(restored.resolution(), Some(&SkillResolution::InvertAll));
        assert_eq!(restored.selected_date(), date(2025, 1, 1));
    }

    #[test]
    fn date_change_discards_resolution() {
        let mut session = static_session(date(2025, 1, 1));
        assert!(session.apply_resolution(SkillResolution::WipeAll));
        session.select_date(date(2025, 1, 2));
        assert_eq!(session.resolution(), None);
    }

    #[test]
    fn language_change_discards_resolution() {
        let mut session = static_session(date(2025, 1, 1));
        assert!(session.apply_resolution(SkillResolution::WipeAll));
        session.set_language(Language::En);
        assert_eq!(session.resolution(), None);
        assert_eq!(session.language(), Language::En);

        // Same language again is a no-op.
        assert!(session.apply_resolution(SkillResolution::WipeAll));
        session.set_language(Language::En);
        assert!(session.resolution().is_some());
    }

    #[test]
    fn locked_day_refuses_resolutions() {
        let mut session = static_session(date(2026, 1, 2));
        assert!(session.day_locked());
        assert!(!session.apply_resolution(SkillResolution::InvertAll));
        assert_eq!(session.resolution(), None);

        let mut rng = StepRng::new(0, 0);
        assert!(!session.activate_skills(&mut rng));
        assert!(session.offered_skills().is_empty());
        assert_eq!(session.effective_guidance(), session.base_guidance());
    }

    #[test]
    fn from_fragment_drops_resolution_on_locked_day() {
        let fragment = build_fragment("2026-01-02", Some(&SkillResolution::InvertAll));
        let session = AlmanacSession::from_fragment(
            Almanac::from_static_assets(),
            date(2025, 1, 1),
            &fragment,
        );
        assert_eq!(session.selected_date(), date(2026, 1, 2));
        assert_eq!(session.resolution(), None);
    }

    #[test]
    fn second_skill_use_is_refused() {
        let mut session = static_session(date(2025, 1, 1));
        assert!(session.apply_resolution(SkillResolution::AllToYi));
        assert!(session.skill_locked());
        assert!(!session.apply_resolution(SkillResolution::InvertAll));
        assert_eq!(session.resolution(), Some(&SkillResolution::AllToYi));
    }

    #[test]
    fn immediate_skill_applies_and_closes_the_flow() {
        let mut session = static_session(date(2025, 4, 10));
        // A constant zero stream always draws the head of the catalog:
        // invert-all, all-to-ji, all-to-yi.
        let mut rng = StepRng::new(0, 0);
        assert!(session.activate_skills(&mut rng));
        assert_eq!(session.offered_skills().len(), SKILLS_TO_DRAW);
        assert_eq!(session.offered_skills()[0].id, SkillId::InvertAll);

        let base = session.base_guidance();
        let event = session.choose_skill(SkillId::InvertAll, &mut rng).unwrap();
        assert_eq!(event, FlowEvent::Applied);
        assert_eq!(session.phase(), &SkillPhase::Idle);
        assert!(session.offered_skills().is_empty());
        let effective = session.effective_guidance();
        assert_eq!(effective.yi, base.ji);
        assert_eq!(effective.ji, base.yi);
    }

    #[test]
    fn unoffered_skill_is_ignored() {
        let mut session = static_session(date(2025, 4, 10));
        let mut rng = StepRng::new(0, 0);
        assert!(session.activate_skills(&mut rng));
        let event = session.choose_skill(SkillId::DestroyFour, &mut rng).unwrap();
        assert_eq!(event, FlowEvent::Ignored);
        assert_eq!(session.resolution(), None);
    }

    #[test]
    fn destroy_four_stores_concrete_references() {
        let mut session = static_session(date(2025, 4, 10));
        // A constant max stream draws from the tail of the catalog, which
        // includes destroy-four.
        let mut rng = StepRng::new(u64::MAX, 0);
        assert!(session.activate_skills(&mut rng));
        assert!(
            session
                .offered_skills()
                .iter()
                .any(|skill| skill.id == SkillId::DestroyFour)
        );

        let base = session.base_guidance();
        let event = session.choose_skill(SkillId::DestroyFour, &mut rng).unwrap();
        assert_eq!(event, FlowEvent::Applied);
        let Some(SkillResolution::DestroyFour { removed }) = session.resolution() else {
            panic!("expected a destroy-four resolution");
        };
        assert_eq!(removed.len(), DESTROY_TARGET_COUNT.min(base.len()));
        assert_eq!(session.effective_guidance().len(), base.len() - removed.len());
    }

    #[test]
    fn targeted_skill_walks_the_entry_prompt() {
        let almanac = Almanac::new(
            AlmanacData::load_from_static(),
            OverrideTable::empty(),
            catalog_of(&[SkillId::RemoveOne]),
        );
        let mut session = AlmanacSession::new(almanac, date(2025, 4, 10));
        let mut rng = StepRng::new(0, 0);
        assert!(session.activate_skills(&mut rng));

        let event = session.choose_skill(SkillId::RemoveOne, &mut rng).unwrap();
        assert_eq!(event, FlowEvent::EntryPrompt(EntryAction::Remove));

        let base = session.base_guidance();
        let victim = base.yi[0].index;
        let event = session.select_entry(ListSide::Yi, victim, &mut rng).unwrap();
        assert_eq!(event, FlowEvent::Applied);
        let effective = session.effective_guidance();
        assert_eq!(effective.yi.len(), base.yi.len() - 1);
        assert!(effective.find(ListSide::Yi, victim).is_none());
    }

    #[test]
    fn reroll_walks_both_prompts() {
        let almanac = Almanac::new(
            AlmanacData::load_from_static(),
            OverrideTable::empty(),
            catalog_of(&[SkillId::RerollOne]),
        );
        let mut session = AlmanacSession::new(almanac, date(2025, 4, 10));
        let mut rng = StepRng::new(0, 0);
        assert!(session.activate_skills(&mut rng));
        assert_eq!(
            session.choose_skill(SkillId::RerollOne, &mut rng).unwrap(),
            FlowEvent::EntryPrompt(EntryAction::Reroll)
        );

        let base = session.base_guidance();
        let target = base.yi[1].index;
        assert_eq!(
            session.select_entry(ListSide::Yi, target, &mut rng).unwrap(),
            FlowEvent::ReplacementPrompt
        );
        let SkillPhase::ChooseReplacement { options, .. } = session.phase().clone() else {
            panic!("expected the replacement prompt");
        };
        assert!(!options.is_empty());
        // Picking something outside the offer changes nothing.
        assert_eq!(session.choose_replacement(999_999), FlowEvent::Ignored);

        let replacement = options[0].index;
        assert_eq!(session.choose_replacement(replacement), FlowEvent::Applied);
        let effective = session.effective_guidance();
        assert!(effective.find(ListSide::Yi, replacement).is_some());
        assert!(effective.find(ListSide::Yi, target).is_none());
    }

    #[test]
    fn reroll_with_exhausted_pool_raises_advisory() {
        let data = AlmanacData {
            yi_entries: vec![AlmanacEntry {
                index: 1,
                title: "甲".to_string(),
                title_en: "A".to_string(),
            }],
            ji_entries: vec![AlmanacEntry {
                index: 2,
                title: "乙".to_string(),
                title_en: "B".to_string(),
            }],
            common_entries: Vec::new(),
        };
        let almanac = Almanac::new(data, OverrideTable::empty(), catalog_of(&[SkillId::RerollOne]));
        let mut session = AlmanacSession::new(almanac, date(2025, 4, 10));
        let mut rng = StepRng::new(0, 0);
        assert!(session.activate_skills(&mut rng));
        session.choose_skill(SkillId::RerollOne, &mut rng).unwrap();

        let result = session.select_entry(ListSide::Yi, 1, &mut rng);
        assert_eq!(result, Err(Advisory::NoOptions));
        // The flow stays on the entry prompt, nothing applied.
        assert!(matches!(session.phase(), SkillPhase::SelectEntry { .. }));
        assert_eq!(session.resolution(), None);
    }

    #[test]
    fn empty_guidance_raises_no_entries() {
        let almanac = Almanac::new(
            AlmanacData::empty(),
            OverrideTable::empty(),
            catalog_of(&[SkillId::AllIn]),
        );
        let mut session = AlmanacSession::new(almanac, date(2025, 4, 10));
        let mut rng = StepRng::new(0, 0);
        assert!(session.activate_skills(&mut rng));
        assert_eq!(
            session.choose_skill(SkillId::AllIn, &mut rng),
            Err(Advisory::NoEntries)
        );
        assert_eq!(session.phase(), &SkillPhase::Idle);
    }

    #[test]
    fn destroy_four_with_empty_guidance_raises_no_targets() {
        let almanac = Almanac::new(
            AlmanacData::empty(),
            OverrideTable::empty(),
            catalog_of(&[SkillId::DestroyFour]),
        );
        let mut session = AlmanacSession::new(almanac, date(2025, 4, 10));
        let mut rng = StepRng::new(0, 0);
        assert!(session.activate_skills(&mut rng));
        assert_eq!(
            session.choose_skill(SkillId::DestroyFour, &mut rng),
            Err(Advisory::NoTargets)
        );
    }
}
