//! Field-level repair rules for the raw CSV export.
//!
//! Every function here is total: malformed input degrades to a fixed default
//! instead of failing the row.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use postboard_server::db::schema::DATETIME_FORMAT;
use regex::Regex;
use serde_json::Value;

/// Trailing ", extra, commas" artifact left by the exporting tool
static EXTRA_COMMAS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i),\s*extra,\s*commas\s*$").expect("Failed to compile extra-commas regex")
});

const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";

/// `true` only for "true", "1" or "yes" in any casing
pub fn clean_boolean(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

pub fn clean_text(value: &str) -> Option<String> {
    let text = value.trim().replace("%%", "%");
    let text = EXTRA_COMMAS_REGEX.replace(&text, "");
    let text = text.trim();

    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Lowercase the address and collapse every run of `@` signs to one
pub fn clean_email(value: &str) -> Option<String> {
    let mut email = value.trim().to_lowercase();
    while email.contains("@@") {
        email = email.replace("@@", "@");
    }

    if email.is_empty() {
        None
    } else {
        Some(email)
    }
}

/// Parse a decimal number and truncate it toward zero.
///
/// Accepts anything a float parses from ("12", "12.9", "1e3"); blank or
/// non-numeric text yields `None`.
pub fn parse_integer(value: &str) -> Option<i64> {
    parse_float(value)
        .filter(|n| n.is_finite())
        .map(|n| n.trunc() as i64)
}

pub fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

pub fn clean_integer(value: &str) -> i64 {
    parse_integer(value).unwrap_or(0)
}

pub fn clean_float(value: &str) -> f64 {
    parse_float(value).unwrap_or(0.0)
}

/// Normalize a timestamp to `YYYY-MM-DD HH:MM:SS`.
///
/// A bare `YYYY-MM-DD` is taken as midnight; anything else is dropped.
pub fn clean_datetime(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT) {
        return Some(datetime.format(DATETIME_FORMAT).to_string());
    }

    NaiveDate::parse_from_str(value, DATE_ONLY_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.format(DATETIME_FORMAT).to_string())
}

pub fn clean_location(value: &str) -> Option<String> {
    let location = value.trim();
    if location.is_empty() || location.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(location.to_string())
    }
}

/// Result of decoding the JSON-encoded tag column
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedTags {
    /// Unique tags in first-seen order
    pub tags: Vec<String>,
    /// Later repeats dropped from the list
    pub duplicates: usize,
    /// Non-blank input that was not a JSON array
    pub malformed: bool,
}

pub fn parse_tags(value: &str) -> ParsedTags {
    if value.trim().is_empty() {
        return ParsedTags::default();
    }

    let elements = match serde_json::from_str::<Value>(value) {
        Ok(Value::Array(elements)) => elements,
        _ => {
            return ParsedTags {
                malformed: true,
                ..ParsedTags::default()
            }
        }
    };

    let mut parsed = ParsedTags::default();
    for element in elements {
        let tag = match element {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };

        if tag.is_empty() {
            continue;
        }
        if parsed.tags.contains(&tag) {
            parsed.duplicates += 1;
        } else {
            parsed.tags.push(tag);
        }
    }

    parsed
}

pub fn clean_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_string()
}
