//! Leaderboard submissions as stored in `beer_leaderboard_entry` metaobjects.
//!
//! The catalog stores every value as a string. `verified` and `time_s` are parsed here,
//! at the boundary, and `verified` is written back as `"true"`/`"false"` only when a
//! record is created or verified.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::catalog::{Fields, MetaobjectRecord};

/// Records fetched for a public leaderboard listing
pub const LISTING_PAGE_SIZE: u32 = 250;

/// Records scanned when looking for the next unverified submission
pub const REVIEW_PAGE_SIZE: u32 = 100;

/// Field keys read or written by the relay
pub mod keys {
    /// Display handle of the chugger
    pub const HANDLE_TEXT: &str = "handle_text";
    /// Leaderboard category, e.g. `RAB`
    pub const LEADERBOARD_TYPE: &str = "leaderboard_type";
    /// White-label leaderboard name
    pub const LEADERBOARD_NAME: &str = "leaderboard_name";
    /// Beer style
    pub const BEER_STYLE: &str = "beer_style";
    /// Container (can, bottle, ...)
    pub const CONTAINER: &str = "container";
    /// Link to the video
    pub const VIDEO_URL: &str = "video_url";
    /// Link to a video uploaded through this service; stored as `video_url`
    pub const VIDEO_UPLOAD_URL: &str = "video_upload_url";
    /// Chug time in seconds
    pub const TIME_S: &str = "time_s";
    /// Volume in fluid ounces
    pub const VOLUME_OZ: &str = "volume_oz";
    /// Seconds until the container reaches the lips
    pub const TIME_TO_RIM_S: &str = "time_to_rim_s";
    /// Seconds until the container is set down
    pub const TIME_TO_SETDOWN_S: &str = "time_to_setdown_s";
    /// Percentage spilled
    pub const SPLASH_PCT: &str = "splash_pct";
    /// Percentage of foam left
    pub const FOAM_PCT: &str = "foam_pct";
    /// Submission timestamp
    pub const DATE_ISO: &str = "date_iso";
    /// `"true"` once an admin approved the entry
    pub const VERIFIED: &str = "verified";
    /// Link to the chugger's profile
    pub const HANDLE_URL: &str = "handle_url";
    /// Free-form location
    pub const LOCATION: &str = "location";
}

/// Fields a submission must carry, in the order they are reported when missing
const REQUIRED_FIELDS: [&str; 5] = [
    keys::HANDLE_TEXT,
    keys::CONTAINER,
    keys::LEADERBOARD_TYPE,
    keys::TIME_S,
    keys::VOLUME_OZ,
];

/// Optional fields forwarded from a submission when present
const OPTIONAL_FIELDS: [&str; 4] = [
    keys::LEADERBOARD_NAME,
    keys::BEER_STYLE,
    keys::HANDLE_URL,
    keys::LOCATION,
];

/// Analysis values written with every new submission until real analysis exists
const PLACEHOLDER_ANALYSIS: [(&str, &str); 4] = [
    (keys::TIME_TO_RIM_S, "0.25"),
    (keys::TIME_TO_SETDOWN_S, "0.25"),
    (keys::SPLASH_PCT, "0.0"),
    (keys::FOAM_PCT, "0.0"),
];

/// Reasons a submission or an edit is rejected before reaching the catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// Required fields are absent or empty
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// A field value cannot be stored as a string
    #[error("Field {key} {reason}")]
    InvalidField {
        /// Offending key
        key: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// An edit carried nothing to change
    #[error("No fields to update")]
    EmptyUpdate,
}

/// Review state parsed from the string `verified` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    /// `verified == "true"`; publicly listed
    Verified,
    /// `verified == "false"`; waiting for review
    Unverified,
    /// Missing or any other value; neither listed nor offered for review
    Unknown,
}

impl VerificationStatus {
    /// Parses the stored value; only the exact strings `"true"` and `"false"` are recognized
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("true") => Self::Verified,
            Some("false") => Self::Unverified,
            _ => Self::Unknown,
        }
    }

    /// Of a record
    #[must_use]
    pub fn of(record: &MetaobjectRecord) -> Self {
        Self::parse(record.fields.get(keys::VERIFIED).map(String::as_str))
    }

    /// The stored form of a known status
    #[must_use]
    pub const fn as_field_value(self) -> Option<&'static str> {
        match self {
            Self::Verified => Some("true"),
            Self::Unverified => Some("false"),
            Self::Unknown => None,
        }
    }
}

/// Parsed `time_s`; non-numeric and non-finite values are `None`
#[must_use]
pub fn time_seconds(record: &MetaobjectRecord) -> Option<f64> {
    record
        .fields
        .get(keys::TIME_S)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite())
}

/// Which field a public leaderboard is selected by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardSelector {
    /// Match on `leaderboard_type`
    Type,
    /// Match on `leaderboard_name`
    Name,
}

impl LeaderboardSelector {
    /// Field key this selector matches on
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Type => keys::LEADERBOARD_TYPE,
            Self::Name => keys::LEADERBOARD_NAME,
        }
    }
}

/// Verified records whose selector field equals `value`, fastest first.
/// Records without a usable `time_s` sort after every timed record.
#[must_use]
pub fn leaderboard(
    records: Vec<MetaobjectRecord>,
    selector: LeaderboardSelector,
    value: &str,
) -> Vec<MetaobjectRecord> {
    let mut entries: Vec<(f64, MetaobjectRecord)> = records
        .into_iter()
        .filter(|record| {
            record.fields.get(selector.field()).map(String::as_str) == Some(value)
                && VerificationStatus::of(record) == VerificationStatus::Verified
        })
        .map(|record| (time_seconds(&record).unwrap_or(f64::INFINITY), record))
        .collect();

    entries.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    entries.into_iter().map(|(_, record)| record).collect()
}

/// First record still waiting for review
#[must_use]
pub fn first_unverified(records: Vec<MetaobjectRecord>) -> Option<MetaobjectRecord> {
    records
        .into_iter()
        .find(|record| VerificationStatus::of(record) == VerificationStatus::Unverified)
}

/// Strips the storefront's `contact[...]` wrapper from a form key
fn form_key(key: &str) -> &str {
    key.strip_prefix("contact[")
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(key)
}

/// Builds the fields of a new, unverified submission from storefront form data.
///
/// Accepts both `contact[handle_text]` and `handle_text` keys. Values are trimmed and
/// empty values count as absent. Unrecognized keys are dropped.
///
/// # Errors
///
/// Returns `SubmissionError::MissingFields` listing every absent required field
pub fn new_submission_fields(
    form: &HashMap<String, String>,
    submitted_at: DateTime<Utc>,
) -> Result<Fields, SubmissionError> {
    let values: HashMap<&str, &str> = form
        .iter()
        .map(|(key, value)| (form_key(key), value.trim()))
        .filter(|(_, value)| !value.is_empty())
        .collect();

    let video_url = values
        .get(keys::VIDEO_URL)
        .or_else(|| values.get(keys::VIDEO_UPLOAD_URL))
        .copied();

    let mut missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|key| !values.contains_key(key))
        .collect();
    if video_url.is_none() {
        missing.push(keys::VIDEO_URL);
    }
    if !missing.is_empty() {
        return Err(SubmissionError::MissingFields(missing));
    }

    let mut fields: Fields = REQUIRED_FIELDS
        .iter()
        .chain(OPTIONAL_FIELDS.iter())
        .filter_map(|key| values.get(key).map(|value| ((*key).to_string(), (*value).to_string())))
        .collect();

    if let Some(video_url) = video_url {
        fields.insert(keys::VIDEO_URL.to_string(), video_url.to_string());
    }
    for (key, value) in PLACEHOLDER_ANALYSIS {
        fields.insert(key.to_string(), value.to_string());
    }
    fields.insert(
        keys::DATE_ISO.to_string(),
        submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    if let Some(unverified) = VerificationStatus::Unverified.as_field_value() {
        fields.insert(keys::VERIFIED.to_string(), unverified.to_string());
    }

    Ok(fields)
}

/// Converts an admin edit body into catalog fields. `verified` is always dropped so an
/// edit can never change review state.
///
/// # Errors
///
/// Returns `SubmissionError::InvalidField` for array or object values and
/// `SubmissionError::EmptyUpdate` when nothing is left to send
pub fn admin_edit_fields(body: Map<String, Value>) -> Result<Fields, SubmissionError> {
    let mut fields = Fields::new();

    for (key, value) in body {
        if key == keys::VERIFIED {
            continue;
        }
        let value = match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(SubmissionError::InvalidField {
                    key,
                    reason: "must be a string, number or boolean",
                });
            }
        };
        fields.insert(key, value);
    }

    if fields.is_empty() {
        return Err(SubmissionError::EmptyUpdate);
    }
    Ok(fields)
}

/// The only change a verify call makes
#[must_use]
pub fn verification_fields() -> Fields {
    VerificationStatus::Verified
        .as_field_value()
        .map(|value| (keys::VERIFIED.to_string(), value.to_string()))
        .into_iter()
        .collect()
}
