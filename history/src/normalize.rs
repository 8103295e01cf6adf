//! Normalization of raw backend change records.
//!
//! The history endpoint has renamed its fields over time (`content_after`
//! versus `content`, `created_at` versus `createdAt`, ...). Each canonical
//! field is read through an ordered list of aliases; the first alias holding
//! a usable value wins.
//!
//! Records the backend generated without a user note carry a fixed
//! placeholder description. It is normalized to an empty string so the UI can
//! tell authored notes apart.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::ChangeRecord;

const ID_ALIASES: &[&str] = &["id", "_id", "change_id", "changeId"];
const VERSION_ALIASES: &[&str] = &["version", "version_number", "versionNumber"];
const CREATED_AT_ALIASES: &[&str] = &["created_at", "createdAt", "timestamp", "date"];
const CONTENT_ALIASES: &[&str] = &["content_after", "contentAfter", "content"];
const DESCRIPTION_ALIASES: &[&str] = &[
    "description",
    "change_description",
    "changeDescription",
    "message",
];
const REVIEWED_ALIASES: &[&str] = &[
    "reviewed",
    "reviewed_by_tutor",
    "reviewedByTutor",
    "is_reviewed",
    "revisado",
];

/// Keys under which a wrapped history response may hold its records.
const ENVELOPE_KEYS: &[&str] = &["history", "changes", "data"];

/// Descriptions the backend writes when the author left none, lowercased.
const PLACEHOLDER_DESCRIPTIONS: &[&str] = &[
    "cambio incremental sin descripcion",
    "cambio incremental sin descripción",
    "incremental change with no description",
];

/// Extracts the list of raw records from a history response body.
///
/// Accepts a bare JSON array, or an object wrapping the array under
/// `history`, `changes` or `data`. Returns `None` for any other shape.
#[must_use]
pub fn extract_records(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(records) => Some(records),
        Value::Object(mut fields) => ENVELOPE_KEYS
            .iter()
            .find_map(|key| match fields.remove(*key) {
                Some(Value::Array(records)) => Some(records),
                _ => None,
            }),
        _ => None,
    }
}

/// Normalizes every raw record, skipping those that cannot be used.
#[must_use]
pub fn normalize_all(raw_records: &[Value]) -> Vec<ChangeRecord> {
    raw_records.iter().filter_map(normalize_record).collect()
}

/// Converts one raw record into canonical shape.
///
/// Returns `None` when the record is not a JSON object or has no identifier,
/// since no content endpoint could address it. Every other missing field
/// takes a neutral default.
#[must_use]
pub fn normalize_record(raw: &Value) -> Option<ChangeRecord> {
    let Some(fields) = raw.as_object() else {
        warn!(kind = json_kind(raw), "Skipping change record that is not an object");
        return None;
    };

    let Some(id) = coalesce(fields, ID_ALIASES, read_identifier) else {
        warn!("Skipping change record without an id");
        return None;
    };

    let version = coalesce(fields, VERSION_ALIASES, read_version).unwrap_or_else(|| {
        debug!(id = %id, "Change record has no version");
        0
    });
    let created_at = coalesce(fields, CREATED_AT_ALIASES, read_timestamp).unwrap_or_default();
    let content = coalesce(fields, CONTENT_ALIASES, read_content).unwrap_or_default();
    let description = coalesce(fields, DESCRIPTION_ALIASES, read_text)
        .map(clean_description)
        .unwrap_or_default();
    let reviewed = coalesce(fields, REVIEWED_ALIASES, read_flag).unwrap_or(false);

    Some(
        ChangeRecord::new(id, version, created_at, content)
            .with_description(description)
            .with_reviewed(reviewed),
    )
}

/// Returns true for the backend's "no description" placeholder.
///
/// Comparison ignores case and surrounding or repeated whitespace.
#[must_use]
pub fn is_placeholder_description(description: &str) -> bool {
    let collapsed = description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    PLACEHOLDER_DESCRIPTIONS.contains(&collapsed.as_str())
}

fn clean_description(description: String) -> String {
    if is_placeholder_description(&description) {
        String::new()
    } else {
        description
    }
}

fn coalesce<T>(
    fields: &Map<String, Value>,
    aliases: &[&str],
    read: fn(&Value) -> Option<T>,
) -> Option<T> {
    aliases
        .iter()
        .filter_map(|alias| fields.get(*alias))
        .find_map(read)
}

fn read_identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn read_version(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a timestamp string, or epoch milliseconds rendered as RFC 3339.
fn read_timestamp(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|timestamp| timestamp.to_rfc3339()),
        _ => read_text(value),
    }
}

/// Reads content text. Structured content (a grid, a document tree) is kept
/// as its JSON serialization.
fn read_content(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn read_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn read_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "si" | "sí" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_canonical_fields() {
        let record = normalize_record(&json!({
            "id": "chg-1",
            "version": 3,
            "created_at": "2024-01-02T00:00:00Z",
            "content": "hello",
            "description": "fixed typo",
            "reviewed": true
        }))
        .unwrap();

        assert_eq!(record.id, "chg-1");
        assert_eq!(record.version, 3);
        assert_eq!(record.created_at, "2024-01-02T00:00:00Z");
        assert_eq!(record.content, "hello");
        assert_eq!(record.size, 5);
        assert_eq!(record.description, "fixed typo");
        assert!(record.reviewed);
    }

    #[test]
    fn content_after_wins_over_content() {
        let record = normalize_record(&json!({
            "id": "x",
            "content_after": "new",
            "content": "old"
        }))
        .unwrap();
        assert_eq!(record.content, "new");
        assert_eq!(record.size, 3);
    }

    #[test]
    fn empty_alias_falls_through_to_next() {
        let record = normalize_record(&json!({
            "id": "x",
            "content_after": "",
            "content": "fallback",
            "created_at": null,
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.content, "fallback");
        assert_eq!(record.created_at, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn camel_case_aliases() {
        let record = normalize_record(&json!({
            "changeId": 42,
            "versionNumber": "7",
            "createdAt": "2024-01-01",
            "contentAfter": "body",
            "changeDescription": "note",
            "reviewedByTutor": "si"
        }))
        .unwrap();
        assert_eq!(record.id, "42");
        assert_eq!(record.version, 7);
        assert_eq!(record.description, "note");
        assert!(record.reviewed);
    }

    #[test]
    fn placeholder_description_is_suppressed() {
        for placeholder in [
            "cambio incremental sin descripcion",
            "  Cambio Incremental Sin Descripcion  ",
            "CAMBIO INCREMENTAL SIN DESCRIPCIÓN",
            "Incremental change with no description",
            "incremental   change\twith no description\n",
        ] {
            let record = normalize_record(&json!({"id": "x", "description": placeholder})).unwrap();
            assert_eq!(record.description, "", "kept {placeholder:?}");
            assert!(!record.has_description());
        }
    }

    #[test]
    fn other_descriptions_pass_through_unchanged() {
        for text in [
            "  added the summary table ",
            "cambio incremental",
            "cambio incremental sin descripcion, revisar",
        ] {
            let record = normalize_record(&json!({"id": "x", "description": text})).unwrap();
            assert_eq!(record.description, text);
        }
    }

    #[test]
    fn missing_fields_take_defaults() {
        let record = normalize_record(&json!({"id": "x"})).unwrap();
        assert_eq!(record.version, 0);
        assert_eq!(record.created_at, "");
        assert_eq!(record.content, "");
        assert_eq!(record.size, 0);
        assert!(!record.reviewed);
    }

    #[test]
    fn records_without_id_are_skipped() {
        assert!(normalize_record(&json!({"version": 1})).is_none());
        assert!(normalize_record(&json!({"id": "   "})).is_none());
        assert!(normalize_record(&json!("chg-1")).is_none());
    }

    #[test]
    fn structured_content_is_serialized() {
        let record = normalize_record(&json!({
            "id": "x",
            "content": [["A1", "B1"], ["A2", "B2"]]
        }))
        .unwrap();
        assert_eq!(record.content, r#"[["A1","B1"],["A2","B2"]]"#);
    }

    #[test]
    fn numeric_timestamp_is_epoch_millis() {
        let record = normalize_record(&json!({"id": "x", "timestamp": 1_704_067_200_000_i64})).unwrap();
        assert_eq!(record.created_at, "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn reviewed_flag_coercions() {
        let cases = [
            (json!(1), true),
            (json!(0), false),
            (json!("true"), true),
            (json!("FALSE"), false),
            (json!("no"), false),
            (json!("maybe"), false),
        ];
        for (value, expected) in cases {
            let record = normalize_record(&json!({"id": "x", "reviewed": value})).unwrap();
            assert_eq!(record.reviewed, expected, "for {value}");
        }
    }

    #[test]
    fn version_coercions() {
        assert_eq!(read_version(&json!(2)), Some(2));
        assert_eq!(read_version(&json!(2.0)), Some(2));
        assert_eq!(read_version(&json!(2.5)), None);
        assert_eq!(read_version(&json!(" 12 ")), Some(12));
        assert_eq!(read_version(&json!("v2")), None);
    }

    #[test]
    fn normalize_all_skips_unusable_records() {
        let raws = vec![json!({"id": "a"}), json!(null), json!({"id": "b"})];
        let records = normalize_all(&raws);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn extract_records_accepts_bare_and_wrapped_lists() {
        assert_eq!(extract_records(json!([{"id": "a"}])).unwrap().len(), 1);
        assert_eq!(extract_records(json!({"history": [{"id": "a"}]})).unwrap().len(), 1);
        assert_eq!(extract_records(json!({"data": []})).unwrap().len(), 0);
        assert!(extract_records(json!({"history": "nope"})).is_none());
        assert!(extract_records(json!("nope")).is_none());
    }
}
