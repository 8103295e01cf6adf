//! Chronological sequencing of change records.
//!
//! The backend's version numbers are not reliable for ordering, so history is
//! ordered by creation time. Records whose timestamp cannot be parsed fall
//! back to their version number as the primary key, on the same numeric axis
//! as epoch milliseconds. Ties are broken by version, then by id, which makes
//! the order total and repeatable across runs.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::label::display_label;
use crate::types::{ChangeRecord, History, SequencedEntry};

/// Offset-less formats the backend has been seen to emit, read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Date-only format, read as midnight UTC.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Orders records chronologically and assigns display labels.
///
/// Empty input yields an empty history. Malformed timestamps never cause an
/// error; they only change where the record sorts.
///
/// # Example
///
/// ```
/// use campus_history::{sequence, ChangeRecord};
///
/// let history = sequence(vec![
///     ChangeRecord::new("b", 2, "2024-01-03T00:00:00Z", ""),
///     ChangeRecord::new("a", 1, "2024-01-01T00:00:00Z", ""),
/// ]);
///
/// assert_eq!(history.entries()[0].record.id, "a");
/// assert_eq!(history.current().unwrap().label, "1.2");
/// ```
#[must_use]
pub fn sequence(records: Vec<ChangeRecord>) -> History {
    let mut keyed: Vec<(i64, ChangeRecord)> = records
        .into_iter()
        .map(|record| (sort_key(&record), record))
        .collect();

    keyed.sort_by(|(key_a, a), (key_b, b)| compare(*key_a, a, *key_b, b));

    let last = keyed.len().checked_sub(1);
    let entries = keyed
        .into_iter()
        .enumerate()
        .map(|(position, (_, record))| SequencedEntry {
            record,
            position,
            label: display_label(position),
            is_current: Some(position) == last,
        })
        .collect();

    History::from_entries(entries)
}

/// Parses a backend timestamp.
///
/// Accepts RFC 3339, offset-less ISO 8601 date-times (with `T` or a space
/// separator, optional fractional seconds) and bare dates. Offset-less values
/// are taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Primary sort key: epoch milliseconds, or the version when unparseable.
fn sort_key(record: &ChangeRecord) -> i64 {
    match parse_timestamp(&record.created_at) {
        Some(timestamp) => timestamp.timestamp_millis(),
        None => {
            debug!(
                id = %record.id,
                version = record.version,
                created_at = %record.created_at,
                "Malformed timestamp, ordering by version"
            );
            record.version
        }
    }
}

fn compare(key_a: i64, a: &ChangeRecord, key_b: i64, b: &ChangeRecord) -> Ordering {
    key_a
        .cmp(&key_b)
        .then(a.version.cmp(&b.version))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, version: i64, created_at: &str) -> ChangeRecord {
        ChangeRecord::new(id, version, created_at, "")
    }

    fn ids(history: &History) -> Vec<&str> {
        history
            .entries()
            .iter()
            .map(|entry| entry.record.id.as_str())
            .collect()
    }

    #[test]
    fn empty_input_yields_empty_history() {
        let history = sequence(Vec::new());
        assert!(history.is_empty());
        assert!(history.current().is_none());
    }

    #[test]
    fn orders_by_timestamp_not_version() {
        let history = sequence(vec![
            record("a", 1, "2024-01-01T00:00:00Z"),
            record("b", 2, "2024-01-03T00:00:00Z"),
            record("c", 3, "2024-01-02T00:00:00Z"),
        ]);

        assert_eq!(ids(&history), ["a", "c", "b"]);

        let labels: Vec<&str> = history.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["1.1", "1.2", "1.3"]);

        let current: Vec<&str> = history
            .entries()
            .iter()
            .filter(|e| e.is_current)
            .map(|e| e.record.id.as_str())
            .collect();
        assert_eq!(current, ["b"]);
    }

    #[test]
    fn positions_are_contiguous_with_single_current() {
        let records = (0..25)
            .rev()
            .map(|day| {
                record(
                    &format!("r{day}"),
                    day,
                    &format!("2024-02-{:02}T08:00:00Z", day + 1),
                )
            })
            .collect();

        let history = sequence(records);

        for (index, entry) in history.entries().iter().enumerate() {
            assert_eq!(entry.position, index);
            assert_eq!(entry.label, display_label(index));
            assert_eq!(entry.is_current, index == 24);
        }
        assert_eq!(history.current().unwrap().record.id, "r24");

        let timestamps: Vec<_> = history
            .entries()
            .iter()
            .map(|e| parse_timestamp(&e.record.created_at).unwrap())
            .collect();
        assert!(timestamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn equal_timestamps_break_ties_by_version() {
        let history = sequence(vec![
            record("x", 7, "2024-03-01T10:00:00Z"),
            record("y", 2, "2024-03-01T10:00:00Z"),
            record("z", 4, "2024-03-01T10:00:00Z"),
        ]);
        assert_eq!(ids(&history), ["y", "z", "x"]);
    }

    #[test]
    fn invalid_timestamps_order_by_version() {
        let history = sequence(vec![
            record("late", 9, "not a date"),
            record("early", 3, ""),
            record("mid", 5, "2024-13-45"),
        ]);
        assert_eq!(ids(&history), ["early", "mid", "late"]);
    }

    #[test]
    fn invalid_timestamps_sort_before_dated_records() {
        let history = sequence(vec![
            record("dated", 1, "2024-01-01T00:00:00Z"),
            record("undated", 2, "garbage"),
        ]);
        assert_eq!(ids(&history), ["undated", "dated"]);
        assert!(history.by_id("dated").unwrap().is_current);
    }

    #[test]
    fn ordering_is_stable_across_runs_and_input_order() {
        let records = vec![
            record("b", 1, "garbage"),
            record("a", 1, "garbage"),
            record("c", 2, "2024-05-05T00:00:00Z"),
            record("d", 2, "2024-05-05T00:00:00Z"),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let first = sequence(records.clone());
        assert_eq!(first, sequence(records));
        assert_eq!(first, sequence(reversed));
        assert_eq!(ids(&first), ["a", "b", "c", "d"]);
    }

    #[test]
    fn display_order_is_most_recent_first() {
        let history = sequence(vec![
            record("a", 1, "2024-01-01T00:00:00Z"),
            record("b", 2, "2024-01-02T00:00:00Z"),
        ]);

        let shown: Vec<&str> = history
            .display_order()
            .map(|e| e.record.id.as_str())
            .collect();
        assert_eq!(shown, ["b", "a"]);
        assert_eq!(ids(&history), ["a", "b"]);
    }

    #[test]
    fn lookup_by_label() {
        let history = sequence(vec![
            record("a", 1, "2024-01-01T00:00:00Z"),
            record("b", 2, "2024-01-02T00:00:00Z"),
        ]);
        assert_eq!(history.by_label("1.2").unwrap().record.id, "b");
        assert!(history.by_label("1.3").is_none());
        assert!(history.by_label("junk").is_none());
    }

    #[test]
    fn parses_supported_timestamp_formats() {
        let expected = parse_timestamp("2024-01-02T03:04:05Z").unwrap();
        assert_eq!(parse_timestamp("2024-01-02T03:04:05+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T03:04:05"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_timestamp(" 2024-01-02T03:04:05.000Z "), Some(expected));
        assert!(parse_timestamp("2024-01-02 03:04:05.250").is_some());
        assert!(parse_timestamp("2024-01-02").is_some());
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        let shifted = parse_timestamp("2024-01-02T05:04:05+02:00").unwrap();
        assert_eq!(shifted, parse_timestamp("2024-01-02T03:04:05Z").unwrap());
    }

    #[test]
    fn rejects_malformed_timestamps() {
        for raw in ["", "   ", "yesterday", "2024-13-01", "01/02/2024"] {
            assert!(parse_timestamp(raw).is_none(), "parsed {raw:?}");
        }
    }
}
