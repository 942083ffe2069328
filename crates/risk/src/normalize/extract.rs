//! Tolerant field extraction from untyped provider payloads
//!
//! Every helper returns `None` or an empty list instead of failing.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// Resolve a dotted path such as `applicationMetaData.inventionTitle`.
pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}

/// Scalar as trimmed text; arrays yield their first usable element.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(as_text),
        _ => None,
    }
}

/// First non-empty text found under any of `paths`.
pub(crate) fn first_text(value: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(as_text)
}

/// First date under any of `paths` that parses.
pub(crate) fn first_date(value: &Value, paths: &[&str]) -> Option<NaiveDate> {
    paths
        .iter()
        .filter_map(|path| lookup(value, path))
        .filter_map(as_text)
        .find_map(|raw| parse_date(&raw))
}

/// Accepts ISO dates, RFC 3339 timestamps, ISO datetimes without offset,
/// compact `YYYYMMDD` and US `MM/DD/YYYY`.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if raw.len() > 10 && raw.is_char_boundary(10) && raw.as_bytes()[10] == b'T' {
        if let Ok(date) = NaiveDate::parse_from_str(&raw[..10], "%Y-%m-%d") {
            return Some(date);
        }
    }
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y%m%d") {
            return Some(date);
        }
    }
    NaiveDate::parse_from_str(raw, "%m/%d/%Y").ok()
}

/// Keys holding a full name inside a person or organization object
const NAME_KEYS: &[&str] = &[
    "name",
    "full_name",
    "organization",
    "assignee_organization",
    "applicantNameText",
    "inventorNameText",
    "inventor_name",
    "orgname",
];

/// (first, last) key pairs combined when no full name is present
const NAME_PARTS: &[(&str, &str)] = &[
    ("first_name", "last_name"),
    ("firstName", "lastName"),
    ("inventor_first_name", "inventor_last_name"),
    ("assignee_first_name", "assignee_last_name"),
];

fn name_of(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => {
            if let Some(name) = NAME_KEYS
                .iter()
                .filter_map(|key| value.get(*key))
                .find_map(as_text)
            {
                return Some(name);
            }

            NAME_PARTS.iter().find_map(|(first, last)| {
                let first = value.get(*first).and_then(as_text);
                let last = value.get(*last).and_then(as_text);
                match (first, last) {
                    (Some(f), Some(l)) => Some(format!("{f} {l}")),
                    (None, Some(l)) => Some(l),
                    (Some(f), None) => Some(f),
                    (None, None) => None,
                }
            })
        }
        other => as_text(other),
    }
}

/// Names from the first of `paths` that is present. Accepts a list of
/// strings, a list of objects or a single string. Exact duplicates are
/// dropped, order is kept.
pub(crate) fn name_list(value: &Value, paths: &[&str]) -> Vec<String> {
    let Some(found) = paths.iter().find_map(|path| lookup(value, path)) else {
        return Vec::new();
    };

    let candidates: Vec<String> = match found {
        Value::Array(items) => items.iter().filter_map(name_of).collect(),
        other => name_of(other).into_iter().collect(),
    };

    let mut names: Vec<String> = Vec::with_capacity(candidates.len());
    for name in candidates {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Keys holding a classification code inside a CPC object
const CODE_KEYS: &[&str] = &[
    "code",
    "cpc_subgroup_id",
    "cpc_group_id",
    "cpc_subsection_id",
    "cpcSymbolText",
    "symbol",
];

fn code_of(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => CODE_KEYS
            .iter()
            .filter_map(|key| value.get(*key))
            .find_map(as_text),
        other => as_text(other),
    }
}

/// Classification codes from the first present path, at most `cap`,
/// whitespace-collapsed and upper-cased. Repeated codes keep their slots.
pub(crate) fn code_list(value: &Value, paths: &[&str], cap: usize) -> Vec<String> {
    let Some(found) = paths.iter().find_map(|path| lookup(value, path)) else {
        return Vec::new();
    };

    let raw: Vec<String> = match found {
        Value::Array(items) => items.iter().filter_map(code_of).collect(),
        Value::String(s) => s
            .split([',', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        other => code_of(other).into_iter().collect(),
    };

    let mut codes: Vec<String> = Vec::with_capacity(cap.min(raw.len()));
    for code in raw {
        let code: String = code.split_whitespace().collect::<Vec<_>>().join("").to_uppercase();
        if !code.is_empty() {
            codes.push(code);
        }
        if codes.len() == cap {
            break;
        }
    }
    codes
}
