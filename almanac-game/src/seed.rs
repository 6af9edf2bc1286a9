//! Per-day deterministic seeding and date-key plumbing.
//!
//! The daily stream must replay identically across sessions, devices, and
//! processes, so it is keyed only by the calendar date and drawn from a
//! platform-stable generator.

use chrono::{Datelike, NaiveDate};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Derive the per-day seed: decimal digit concatenation of year, month
/// (1-indexed) and day, without zero padding. 2025-12-20 becomes 20251220,
/// 2026-01-02 becomes 202612.
#[must_use]
pub fn day_seed(date: NaiveDate) -> u64 {
    let year = u64::from(date.year().unsigned_abs());
    let mut seed = append_digits(year, u64::from(date.month()));
    seed = append_digits(seed, u64::from(date.day()));
    seed
}

fn append_digits(seed: u64, part: u64) -> u64 {
    let mut scale = 10;
    while scale <= part {
        scale *= 10;
    }
    seed * scale + part
}

/// The deterministic random stream for a calendar date. Every generation
/// draw for the day comes from one instance of this stream, in a fixed
/// order, so repeated calls reproduce the same guidance.
#[must_use]
pub fn day_rng(date: NaiveDate) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(day_seed(date))
}

/// Zero-padded `YYYY-MM-DD` key used by the override table and the URL
/// fragment.
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        date.month(),
        date.day()
    )
}

/// Tolerant date-key parse. Accepts unpadded components; anything that is
/// not a real calendar date yields `None` and the caller falls back to the
/// current date.
#[must_use]
pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    let mut parts = value.split('-');
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}
