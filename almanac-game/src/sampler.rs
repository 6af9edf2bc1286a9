//! Without-replacement sampling over entry pools.

use rand::Rng;
use std::collections::HashSet;

use crate::data::AlmanacEntry;

/// Draw up to `count` entries from `pool` without replacement, skipping any
/// entry whose index is in `exclude`. Returns fewer than `count` when the
/// remaining pool runs out; an undersized pool is never an error.
pub fn sample_entries<R>(
    pool: &[AlmanacEntry],
    count: usize,
    rng: &mut R,
    exclude: &HashSet<u32>,
) -> Vec<AlmanacEntry>
where
    R: Rng + ?Sized,
{
    let mut working: Vec<&AlmanacEntry> = pool
        .iter()
        .filter(|entry| !exclude.contains(&entry.index))
        .collect();
    let mut selections = Vec::with_capacity(count.min(working.len()));
    while selections.len() < count && !working.is_empty() {
        let idx = rng.gen_range(0..working.len());
        selections.push(working.remove(idx).clone());
    }
    selections
}
