//! Canonical glacier keys extracted from heterogeneous inventory IDs.
//!
//! Recognized shapes, tried in order:
//!
//! 1. versioned inventory IDs: a standalone region letter, an optional `-`/`_`,
//!    a two-digit region, a `-`/`_`/`.` separator and the glacier number
//!    (`RGI2000-v7.0-I-15-03456`, `RGI2000-v7.0-G-14.03456`);
//! 2. dotted IDs with a two-digit region (`RGI60-15.03456`);
//! 3. any `digits.digits` run in free text (`glacier 5.123`).
//!
//! Numbers directly after a `v`/`V` are version tags and never form a key.
//! Parsing never fails loudly: an ID with no recognizable key yields `None`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Normalized `"{region:02}.{number}"` key shared by every data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GlacierKey {
    region: u8,
    number: String,
}

impl GlacierKey {
    /// Inventory region number.
    #[must_use]
    pub fn region(&self) -> u8 {
        self.region
    }

    /// Glacier number within the region, leading zeros preserved.
    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }
}

impl fmt::Display for GlacierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{}", self.region, self.number)
    }
}

/// Rejected canonical key text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a canonical RR.NNNN glacier key")]
pub struct KeyParseError(String);

impl FromStr for GlacierKey {
    type Err = KeyParseError;

    /// Parse an already-canonical key; use [`normalize_key`] for raw IDs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let canonical = bytes.len() >= 4
            && bytes[0].is_ascii_digit()
            && bytes[1].is_ascii_digit()
            && bytes[2] == b'.'
            && bytes[3..].iter().all(u8::is_ascii_digit);
        if !canonical {
            return Err(KeyParseError(s.to_string()));
        }
        build_key(&bytes[..2], &bytes[3..]).ok_or_else(|| KeyParseError(s.to_string()))
    }
}

impl TryFrom<String> for GlacierKey {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GlacierKey> for String {
    fn from(key: GlacierKey) -> Self {
        key.to_string()
    }
}

/// Extract the canonical key from a raw inventory ID, if it has one.
#[must_use]
pub fn normalize_key(raw: &str) -> Option<GlacierKey> {
    let bytes = raw.trim().as_bytes();
    versioned(bytes)
        .or_else(|| dotted(bytes))
        .or_else(|| free_text(bytes))
}

/// End (exclusive) of the ASCII digit run starting at `start`.
fn digit_run(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map_or(bytes.len(), |offset| start + offset)
}

fn is_version_tag(bytes: &[u8], start: usize) -> bool {
    start > 0 && matches!(bytes[start - 1], b'v' | b'V')
}

fn build_key(region: &[u8], number: &[u8]) -> Option<GlacierKey> {
    let region: u8 = std::str::from_utf8(region).ok()?.parse().ok()?;
    let number = std::str::from_utf8(number).ok()?.to_string();
    if number.is_empty() {
        return None;
    }
    Some(GlacierKey { region, number })
}

fn versioned(bytes: &[u8]) -> Option<GlacierKey> {
    for i in 0..bytes.len() {
        if !bytes[i].is_ascii_alphabetic() {
            continue;
        }
        if i > 0 && bytes[i - 1].is_ascii_alphanumeric() {
            continue;
        }
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'-' | b'_') {
            j += 1;
        }
        if j >= bytes.len() || !bytes[j].is_ascii_digit() {
            continue;
        }
        let region_end = digit_run(bytes, j);
        if region_end - j != 2 {
            continue;
        }
        if region_end >= bytes.len() || !matches!(bytes[region_end], b'-' | b'_' | b'.') {
            continue;
        }
        let number_start = region_end + 1;
        if number_start >= bytes.len() || !bytes[number_start].is_ascii_digit() {
            continue;
        }
        let number_end = digit_run(bytes, number_start);
        return build_key(&bytes[j..region_end], &bytes[number_start..number_end]);
    }
    None
}

fn dotted(bytes: &[u8]) -> Option<GlacierKey> {
    if bytes.len() < 4 {
        return None;
    }
    for i in 0..bytes.len() - 3 {
        let window = &bytes[i..i + 4];
        if window[0].is_ascii_digit()
            && window[1].is_ascii_digit()
            && window[2] == b'.'
            && window[3].is_ascii_digit()
            && !is_version_tag(bytes, i)
        {
            let number_end = digit_run(bytes, i + 3);
            return build_key(&bytes[i..i + 2], &bytes[i + 3..number_end]);
        }
    }
    None
}

fn free_text(bytes: &[u8]) -> Option<GlacierKey> {
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let run_end = digit_run(bytes, i);
        let has_fraction = run_end + 1 < bytes.len()
            && bytes[run_end] == b'.'
            && bytes[run_end + 1].is_ascii_digit();
        if has_fraction && run_end - i <= 2 && !is_version_tag(bytes, i) {
            let number_end = digit_run(bytes, run_end + 1);
            return build_key(&bytes[i..run_end], &bytes[run_end + 1..number_end]);
        }
        i = run_end;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{GlacierKey, normalize_key};

    fn key(raw: &str) -> Option<String> {
        normalize_key(raw).map(|k| k.to_string())
    }

    #[test]
    fn versioned_inventory_id() {
        assert_eq!(key("RGI2000-v7.0-I-15-03456").as_deref(), Some("15.03456"));
    }

    #[test]
    fn dotted_inventory_id() {
        assert_eq!(key("RGI60-15.03456").as_deref(), Some("15.03456"));
    }

    #[test]
    fn versioned_and_dotted_agree() {
        assert_eq!(
            normalize_key("RGI2000-v7.0-I-15-03456"),
            normalize_key("RGI60-15.03456")
        );
    }

    #[test]
    fn alternate_delimiters() {
        assert_eq!(key("RGI2000-v7.0-G-14.03456").as_deref(), Some("14.03456"));
        assert_eq!(key("rgi7_I_15_00001").as_deref(), Some("15.00001"));
        assert_eq!(key("I15-00042").as_deref(), Some("15.00042"));
    }

    #[test]
    fn version_tag_is_not_a_key() {
        assert_eq!(key("RGI2000-v5.0-14.03456").as_deref(), Some("14.03456"));
        assert_eq!(key("RGI2000-v7.0-X"), None);
    }

    #[test]
    fn free_text_single_digit_region_is_padded() {
        assert_eq!(key("glacier 5.123 north").as_deref(), Some("05.123"));
    }

    #[test]
    fn no_pattern_yields_none() {
        assert_eq!(key("GLACIER-ABC"), None);
        assert_eq!(key("RGI60-15-xyz"), None);
        assert_eq!(key(""), None);
        assert_eq!(key("12345"), None);
    }

    #[test]
    fn canonical_round_trip_through_string() {
        let k: GlacierKey = "15.03456".parse().unwrap();
        assert_eq!(k.region(), 15);
        assert_eq!(k.number(), "03456");
        assert_eq!(String::from(k), "15.03456");
        assert!("RGI60-15.03456".parse::<GlacierKey>().is_err());
    }
}
