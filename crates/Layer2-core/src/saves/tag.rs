//! Save tag naming
//!
//! A save is an annotated tag named `save_<epochMillis>_<base64url(name)>`.
//! Its annotation is the description followed by a `Last Updated:` line.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

/// Reserved prefix of every save tag
pub const TAG_PREFIX: &str = "save_";

/// Glob selecting save tags
pub const TAG_PATTERN: &str = "save_*";

/// Leading text of the updated-at line in a tag annotation
pub const UPDATED_SENTINEL: &str = "Last Updated:";

/// Accepts both padded and unpadded input
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

lazy_static! {
    static ref SAVE_TAG: Regex = Regex::new(r"^save_(\d+)_(.+)$").unwrap();
}

/// Build a tag name for `name` created at `at`
pub fn make_tag(name: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}{}_{}",
        TAG_PREFIX,
        at.timestamp_millis(),
        URL_SAFE_NO_PAD.encode(name.as_bytes())
    )
}

/// Components of a save tag name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    pub millis: i64,
    /// Decoded display name; the raw suffix when it does not decode
    pub name: String,
    pub decoded: bool,
}

/// Split a tag name; `None` for tags outside the save namespace
pub fn parse_tag(tag: &str) -> Option<ParsedTag> {
    let caps = SAVE_TAG.captures(tag)?;
    let millis = caps[1].parse().ok()?;
    let suffix = &caps[2];

    match decode_name(suffix) {
        Some(name) => Some(ParsedTag {
            millis,
            name,
            decoded: true,
        }),
        None => Some(ParsedTag {
            millis,
            name: suffix.to_string(),
            decoded: false,
        }),
    }
}

/// Display name of a tag, falling back to the raw suffix
pub fn tag_display_name(tag: &str) -> Option<String> {
    parse_tag(tag).map(|p| p.name)
}

fn decode_name(encoded: &str) -> Option<String> {
    let bytes = URL_SAFE_LENIENT.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}

/// Tag annotation: description plus the updated-at line
pub fn annotation(description: &str, updated_at: DateTime<Utc>) -> String {
    format!(
        "{}\n{} {}",
        description,
        UPDATED_SENTINEL,
        updated_at.to_rfc3339()
    )
}

/// Annotation split into description and updated-at
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub description: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Parse an annotation written by [`annotation`]
///
/// Every sentinel line is removed; the last parseable one wins.
pub fn parse_annotation(contents: &str) -> Annotation {
    let mut updated_at = None;
    let mut kept = Vec::new();

    for line in contents.lines() {
        match line.trim_start().strip_prefix(UPDATED_SENTINEL) {
            Some(rest) => {
                if let Ok(ts) = DateTime::parse_from_rfc3339(rest.trim()) {
                    updated_at = Some(ts.with_timezone(&Utc));
                }
            }
            None => kept.push(line),
        }
    }

    Annotation {
        description: kept.join("\n").trim().to_string(),
        updated_at,
    }
}
