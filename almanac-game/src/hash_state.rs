//! Shareable state codec: resolution token and URL-fragment composition.
//!
//! The token is an obfuscation-free, round-trippable encoding, not a
//! security boundary. Anything malformed decodes to "no state" rather than
//! an error.

use chrono::NaiveDate;

use crate::seed::parse_date_key;
use crate::skills::SkillResolution;

const SKILL_PREFIX: &str = "skill=";

/// Serialize a resolution to its percent-escaped JSON token.
#[must_use]
pub fn encode_resolution(resolution: &SkillResolution) -> String {
    let json = serde_json::to_string(resolution).unwrap_or_default();
    urlencoding::encode(&json).into_owned()
}

/// Parse a token back into a resolution. `None` on any malformed input.
#[must_use]
pub fn decode_resolution(value: &str) -> Option<SkillResolution> {
    let decoded = urlencoding::decode(value).ok()?;
    match serde_json::from_str(&decoded) {
        Ok(resolution) => Some(resolution),
        Err(err) => {
            log::debug!("discarding malformed skill token: {err}");
            None
        }
    }
}

/// Pick the resolution out of the `|`-separated fragment parts. The first
/// part carrying the `skill=` prefix decides, even when it fails to decode.
#[must_use]
pub fn extract_resolution(parts: &[&str]) -> Option<SkillResolution> {
    parts
        .iter()
        .find_map(|part| part.strip_prefix(SKILL_PREFIX))
        .and_then(decode_resolution)
}

/// Compose the addressable fragment: `#<dateKey>` alone, or with the
/// encoded resolution appended as `|skill=<token>`.
#[must_use]
pub fn build_fragment(date_key: &str, resolution: Option<&SkillResolution>) -> String {
    match resolution {
        Some(resolution) => {
            format!("#{date_key}|{SKILL_PREFIX}{}", encode_resolution(resolution))
        }
        None => format!("#{date_key}"),
    }
}

/// Decoded addressable state. Both fields degrade to `None` independently;
/// the caller substitutes the current date and "no resolution".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HashState {
    pub date: Option<NaiveDate>,
    pub resolution: Option<SkillResolution>,
}

/// Tolerantly parse a fragment (with or without the leading `#`).
#[must_use]
pub fn parse_fragment(fragment: &str) -> HashState {
    let value = fragment.trim_start_matches('#').trim();
    if value.is_empty() {
        return HashState::default();
    }
    let parts: Vec<&str> = value.split('|').collect();
    let date = parse_date_key(parts[0]);
    let resolution = extract_resolution(&parts[1..]);
    HashState { date, resolution }
}
