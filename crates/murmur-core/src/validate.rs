//! Structural gate applied to envelopes before they move downstream.
//!
//! Checks run in a fixed order and stop at the first failure: required keys,
//! value types, numeric ranges, enum membership, URL shape, then the nested
//! account keys. The gate runs twice in the pipeline. After harvesting the
//! enrichment fields may be absent or null; before indexing they are required.

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::envelope::parse_timestamp;
use crate::Envelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Freshly normalized, not yet enriched.
    Harvested,
    /// Sentiment and keywords attached, about to be indexed.
    Enriched,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing required key: {0}")]
    MissingKey(String),

    #[error("{field} must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("{field} must not be empty")]
    Empty { field: String },

    #[error("{field} out of range: {reason}")]
    OutOfRange { field: String, reason: String },

    #[error("{field} has value {value:?}, expected one of {allowed:?}")]
    NotInEnum {
        field: String,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("missing required account key: {0}")]
    MissingAccountKey(String),

    #[error("envelope does not match schema: {0}")]
    Schema(String),
}

const TOP_LEVEL_KEYS: &[&str] = &["platform", "version", "fetchedAt", "data"];
const ENRICHED_KEYS: &[&str] = &["sentiment", "sentimentLabel", "keywords"];
const DATA_KEYS: &[&str] = &[
    "id",
    "createdAt",
    "content",
    "sensitive",
    "favouritesCount",
    "repliesCount",
    "tags",
    "url",
    "account",
];
const ACCOUNT_KEYS: &[&str] = &[
    "id",
    "username",
    "createdAt",
    "followersCount/linkKarma",
    "followingCount/commentKarma",
];
const PLATFORMS: &[&str] = &["Reddit", "Mastodon", "Bluesky"];
const LABELS: &[&str] = &["positive", "neutral", "negative"];

/// Run the gate over a raw JSON envelope and decode it on success.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate(value: &Value, stage: Stage) -> Result<Envelope, ValidationError> {
    let root = value.as_object().ok_or(ValidationError::WrongType {
        field: "envelope".to_string(),
        expected: "an object",
    })?;

    check_required_keys(root, stage)?;
    let data = object_at(root, "data", "data")?;
    check_types(root, data)?;
    check_ranges(root, data, stage)?;
    check_enums(root, stage)?;
    check_url(data)?;
    check_account(data)?;

    serde_json::from_value(value.clone()).map_err(|e| ValidationError::Schema(e.to_string()))
}

impl Envelope {
    /// Round-trip this envelope through the gate.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validated(self, stage: Stage) -> Result<Envelope, ValidationError> {
        let value =
            serde_json::to_value(&self).map_err(|e| ValidationError::Schema(e.to_string()))?;
        validate(&value, stage)
    }
}

fn check_required_keys(root: &Map<String, Value>, stage: Stage) -> Result<(), ValidationError> {
    for key in TOP_LEVEL_KEYS {
        if !root.contains_key(*key) {
            return Err(ValidationError::MissingKey((*key).to_string()));
        }
    }
    if stage == Stage::Enriched {
        for key in ENRICHED_KEYS {
            if !root.contains_key(*key) {
                return Err(ValidationError::MissingKey((*key).to_string()));
            }
        }
    }
    if let Some(Value::Object(data)) = root.get("data") {
        for key in DATA_KEYS {
            if !data.contains_key(*key) {
                return Err(ValidationError::MissingKey(format!("data.{key}")));
            }
        }
    }
    Ok(())
}

fn object_at<'a>(
    parent: &'a Map<String, Value>,
    key: &str,
    field: &str,
) -> Result<&'a Map<String, Value>, ValidationError> {
    parent
        .get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| wrong_type(field, "an object"))
}

fn wrong_type(field: &str, expected: &'static str) -> ValidationError {
    ValidationError::WrongType {
        field: field.to_string(),
        expected,
    }
}

fn is_integer(v: &Value) -> bool {
    v.is_i64() || v.is_u64()
}

fn is_string_array(v: &Value) -> bool {
    v.as_array()
        .is_some_and(|items| items.iter().all(Value::is_string))
}

fn is_timestamp(v: &Value) -> bool {
    v.as_str().and_then(parse_timestamp).is_some()
}

fn check_types(root: &Map<String, Value>, data: &Map<String, Value>) -> Result<(), ValidationError> {
    let field = |m: &Map<String, Value>, k: &str| m.get(k).cloned().unwrap_or(Value::Null);

    if !field(root, "platform").is_string() {
        return Err(wrong_type("platform", "a string"));
    }
    if !field(root, "version").is_number() {
        return Err(wrong_type("version", "a number"));
    }
    if !is_timestamp(&field(root, "fetchedAt")) {
        return Err(wrong_type("fetchedAt", "an ISO-8601 timestamp"));
    }
    if let Some(v) = root.get("sentiment") {
        if !(v.is_null() || v.is_number()) {
            return Err(wrong_type("sentiment", "null or a number"));
        }
    }
    if let Some(v) = root.get("sentimentLabel") {
        if !(v.is_null() || v.is_string()) {
            return Err(wrong_type("sentimentLabel", "null or a string"));
        }
    }
    if let Some(v) = root.get("keywords") {
        if !is_string_array(v) {
            return Err(wrong_type("keywords", "an array of strings"));
        }
    }

    match data.get("id").and_then(Value::as_str) {
        None => return Err(wrong_type("data.id", "a string")),
        Some(id) if id.trim().is_empty() => {
            return Err(ValidationError::Empty {
                field: "data.id".to_string(),
            })
        }
        Some(_) => {}
    }
    if !is_timestamp(&field(data, "createdAt")) {
        return Err(wrong_type("data.createdAt", "an ISO-8601 timestamp"));
    }
    match data.get("content").and_then(Value::as_str) {
        None => return Err(wrong_type("data.content", "a string")),
        Some(content) if content.trim().is_empty() => {
            return Err(ValidationError::Empty {
                field: "data.content".to_string(),
            })
        }
        Some(_) => {}
    }
    if !field(data, "sensitive").is_boolean() {
        return Err(wrong_type("data.sensitive", "a boolean"));
    }
    for key in ["favouritesCount", "repliesCount"] {
        if !is_integer(&field(data, key)) {
            return Err(wrong_type(&format!("data.{key}"), "an integer"));
        }
    }
    if !is_string_array(&field(data, "tags")) {
        return Err(wrong_type("data.tags", "an array of strings"));
    }
    if !field(data, "url").is_string() {
        return Err(wrong_type("data.url", "a string"));
    }
    if !field(data, "account").is_object() {
        return Err(wrong_type("data.account", "an object"));
    }
    Ok(())
}

fn check_ranges(
    root: &Map<String, Value>,
    data: &Map<String, Value>,
    stage: Stage,
) -> Result<(), ValidationError> {
    match root.get("sentiment").and_then(Value::as_f64) {
        Some(score) if !(-1.0..=1.0).contains(&score) => {
            return Err(ValidationError::OutOfRange {
                field: "sentiment".to_string(),
                reason: format!("{score} is outside [-1, 1]"),
            });
        }
        None if stage == Stage::Enriched => {
            return Err(wrong_type("sentiment", "a number after enrichment"));
        }
        _ => {}
    }
    for key in ["favouritesCount", "repliesCount"] {
        if let Some(n) = data.get(key).and_then(Value::as_i64) {
            if n < 0 {
                return Err(ValidationError::OutOfRange {
                    field: format!("data.{key}"),
                    reason: format!("{n} is negative"),
                });
            }
        }
    }
    Ok(())
}

fn check_enums(root: &Map<String, Value>, stage: Stage) -> Result<(), ValidationError> {
    if let Some(platform) = root.get("platform").and_then(Value::as_str) {
        if !PLATFORMS.contains(&platform) {
            return Err(ValidationError::NotInEnum {
                field: "platform".to_string(),
                value: platform.to_string(),
                allowed: PLATFORMS,
            });
        }
    }
    match root.get("sentimentLabel").and_then(Value::as_str) {
        Some(label) if !LABELS.contains(&label) => Err(ValidationError::NotInEnum {
            field: "sentimentLabel".to_string(),
            value: label.to_string(),
            allowed: LABELS,
        }),
        None if stage == Stage::Enriched => {
            Err(wrong_type("sentimentLabel", "a label after enrichment"))
        }
        _ => Ok(()),
    }
}

fn check_url(data: &Map<String, Value>) -> Result<(), ValidationError> {
    let raw = data.get("url").and_then(Value::as_str).unwrap_or_default();
    let invalid = |reason: &str| ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let parsed = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if parsed.scheme().is_empty() {
        return Err(invalid("missing scheme"));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(())
}

fn check_account(data: &Map<String, Value>) -> Result<(), ValidationError> {
    let account = object_at(data, "account", "data.account")?;
    for key in ACCOUNT_KEYS {
        if !account.contains_key(*key) {
            return Err(ValidationError::MissingAccountKey((*key).to_string()));
        }
    }
    let id = &account["id"];
    if !(id.is_null() || id.is_string()) {
        return Err(wrong_type("data.account.id", "null or a string"));
    }
    if !account["username"].is_string() {
        return Err(wrong_type("data.account.username", "a string"));
    }
    let created = &account["createdAt"];
    if !(created.is_null() || is_timestamp(created)) {
        return Err(wrong_type(
            "data.account.createdAt",
            "null or an ISO-8601 timestamp",
        ));
    }
    for key in ["followersCount/linkKarma", "followingCount/commentKarma"] {
        let v = &account[key];
        if v.is_null() {
            continue;
        }
        match v.as_i64() {
            Some(n) if n < 0 => {
                return Err(ValidationError::OutOfRange {
                    field: format!("data.account.{key}"),
                    reason: format!("{n} is negative"),
                })
            }
            Some(_) => {}
            None if v.is_u64() => {}
            None => return Err(wrong_type(&format!("data.account.{key}"), "null or an integer")),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
