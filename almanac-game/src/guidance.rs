//! Daily guidance assembly: overrides, quota adjustment, seeded sampling.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::data::{AlmanacData, AlmanacEntry, ListSide};
use crate::overrides::{
    OverrideOrigin, OverrideTable, ResolvedOverride, resolve_override_entries,
};
use crate::sampler::sample_entries;
use crate::seed::{date_key, day_rng};

/// Base specific-pool quota per side.
const BASE_SPECIFIC_COUNT: usize = 2;
/// Base common-pool quota per side.
const BASE_COMMON_COUNT: usize = 2;

/// One day's guidance: the auspicious (yi) and avoid (ji) lists, in display
/// order. Indices are unique within each list and never shared across the
/// two lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GuidanceSet {
    pub yi: Vec<AlmanacEntry>,
    pub ji: Vec<AlmanacEntry>,
}

impl GuidanceSet {
    /// The entries of one list side.
    #[must_use]
    pub fn list(&self, side: ListSide) -> &[AlmanacEntry] {
        match side {
            ListSide::Yi => &self.yi,
            ListSide::Ji => &self.ji,
        }
    }

    /// Total entry count across both lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.yi.len() + self.ji.len()
    }

    /// True when both lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.yi.is_empty() && self.ji.is_empty()
    }

    /// Find an entry by list side and index.
    #[must_use]
    pub fn find(&self, side: ListSide, index: u32) -> Option<&AlmanacEntry> {
        self.list(side).iter().find(|entry| entry.index == index)
    }

    /// Every index currently present in either list.
    #[must_use]
    pub fn all_indices(&self) -> HashSet<u32> {
        self.yi
            .iter()
            .chain(&self.ji)
            .map(|entry| entry.index)
            .collect()
    }
}

struct SideQuota {
    specific: usize,
    common: usize,
}

/// Overrides consume the day's entry budget: the specific quota shrinks
/// first, then the common quota, neither below zero.
fn adjusted_quota(override_count: usize) -> SideQuota {
    let reduce_specific = BASE_SPECIFIC_COUNT.min(override_count);
    let reduce_common = (override_count - reduce_specific).min(BASE_COMMON_COUNT);
    SideQuota {
        specific: BASE_SPECIFIC_COUNT - reduce_specific,
        common: BASE_COMMON_COUNT - reduce_common,
    }
}

fn indices_with_origin(resolved: &[ResolvedOverride], origin: OverrideOrigin) -> HashSet<u32> {
    resolved
        .iter()
        .filter(|item| item.origin == origin)
        .map(|item| item.entry.index)
        .collect()
}

fn assemble(
    overrides: Vec<ResolvedOverride>,
    specific: Vec<AlmanacEntry>,
    common: Vec<AlmanacEntry>,
) -> Vec<AlmanacEntry> {
    let mut list: Vec<AlmanacEntry> = overrides.into_iter().map(|item| item.entry).collect();
    list.extend(specific);
    list.extend(common);
    list
}

/// Generate the full guidance set for a date. Deterministic: the single
/// per-day stream feeds every draw in a fixed order (yi specific, yi common,
/// ji specific, ji common), so repeated calls with the same data and
/// override tables are identical.
#[must_use]
pub fn generate_guidance(
    date: NaiveDate,
    data: &AlmanacData,
    overrides: &OverrideTable,
) -> GuidanceSet {
    let mut rng = day_rng(date);
    let key = date_key(date);
    let day = overrides.day(&key).cloned().unwrap_or_default();

    let yi_overrides = resolve_override_entries(
        &day.yi,
        &data.yi_entries,
        &data.common_entries,
        &key,
        ListSide::Yi,
    );
    let ji_overrides = resolve_override_entries(
        &day.ji,
        &data.ji_entries,
        &data.common_entries,
        &key,
        ListSide::Ji,
    );

    let yi_quota = adjusted_quota(yi_overrides.len());
    let ji_quota = adjusted_quota(ji_overrides.len());

    let yi_specific_exclude = indices_with_origin(&yi_overrides, OverrideOrigin::Specific);
    let yi_specific = sample_entries(
        &data.yi_entries,
        yi_quota.specific,
        &mut rng,
        &yi_specific_exclude,
    );

    // Common entries are unique across the whole day: both sides' resolved
    // common overrides are off limits before any common draw happens.
    let mut used_common = indices_with_origin(&yi_overrides, OverrideOrigin::Common);
    used_common.extend(indices_with_origin(&ji_overrides, OverrideOrigin::Common));

    let yi_common = sample_entries(&data.common_entries, yi_quota.common, &mut rng, &used_common);
    used_common.extend(yi_common.iter().map(|entry| entry.index));

    let ji_specific_exclude = indices_with_origin(&ji_overrides, OverrideOrigin::Specific);
    let ji_specific = sample_entries(
        &data.ji_entries,
        ji_quota.specific,
        &mut rng,
        &ji_specific_exclude,
    );

    let ji_common = sample_entries(&data.common_entries, ji_quota.common, &mut rng, &used_common);

    GuidanceSet {
        yi: assemble(yi_overrides, yi_specific, yi_common),
        ji: assemble(ji_overrides, ji_specific, ji_common),
    }
}
