//! Record model and the two line parsers described in the component design:
//! a strict parser used by the offset locator and the indexed read paths,
//! and a permissive parser used by the user-facing bulk/raw endpoints so
//! that non-JSON lines still show up in the output.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// A single log line, parsed into its well-known fields plus whatever else
/// the JSON object carried.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Record {
    pub level: Option<String>,
    pub time: Option<String>,
    pub module: Option<String>,
    pub msg: Option<String>,

    /// Every other key present on the JSON object, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// `time` parsed to milliseconds since the epoch. `Some` iff the record
    /// is strict (see module docs). Not part of the wire representation —
    /// the reader and locator are the only consumers.
    #[serde(skip)]
    pub time_ms: Option<i64>,
}

impl Record {
    /// True iff this record can participate in time-indexed search —
    /// i.e. its `time` field parsed to a valid instant.
    pub fn is_strict(&self) -> bool {
        self.time_ms.is_some()
    }

    fn synthesized(raw_line: &str) -> Record {
        Record {
            level: Some("info".to_string()),
            time: None,
            module: None,
            msg: Some(raw_line.to_string()),
            extra: Map::new(),
            time_ms: Some(Utc::now().timestamp_millis()),
        }
    }

    fn from_object(mut map: Map<String, Value>) -> Record {
        let time = map
            .remove("time")
            .and_then(|v| v.as_str().map(|s| s.to_string()));
        let time_ms = time.as_deref().and_then(parse_instant_ms);
        let level = map
            .remove("level")
            .and_then(|v| v.as_str().map(|s| s.to_lowercase()));
        let module = map
            .remove("module")
            .and_then(|v| v.as_str().map(|s| s.to_string()));
        let msg = map
            .remove("msg")
            .and_then(|v| v.as_str().map(|s| s.to_string()));

        Record {
            level,
            time,
            module,
            msg,
            extra: map,
            time_ms,
        }
    }
}

/// Strict parse: returns a record only if `line` is a JSON object with a
/// `time` field that parses via [`parse_instant_ms`]. This is the only
/// parser the offset locator and the streaming reader's indexed inner loop
/// may use — it is what "strict record" means throughout this crate.
pub fn strict_parse(line: &str) -> Option<Record> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Value::Object(map) = serde_json::from_str::<Value>(trimmed).ok()? else {
        return None;
    };
    let record = Record::from_object(map);
    record.is_strict().then_some(record)
}

/// Permissive parse: like [`strict_parse`] for well-formed JSON objects
/// (even ones with a missing or unparseable `time`), but synthesizes a
/// `level=info` record carrying the raw line as `msg` when the line isn't a
/// JSON object at all. Used only by the bulk and raw endpoints. Blank lines
/// still parse to nothing.
pub fn permissive_parse(line: &str) -> Option<Record> {
    if line.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(line.trim()) {
        Ok(Value::Object(map)) => Some(Record::from_object(map)),
        _ => Some(Record::synthesized(line)),
    }
}

/// Parses a timestamp against the grammar in the external interfaces
/// section, tried in order: a full instant with timezone, a naive local
/// instant, a space-separated form, and a date-only form. Naive forms are
/// interpreted as UTC.
pub fn parse_instant_ms(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_parse_accepts_zoned_time() {
        let line = r#"{"level":"INFO","time":"2025-12-01T00:00:00Z","msg":"hello"}"#;
        let rec = strict_parse(line).unwrap();
        assert_eq!(rec.level.as_deref(), Some("info"));
        assert_eq!(rec.msg.as_deref(), Some("hello"));
        assert!(rec.is_strict());
    }

    #[test]
    fn strict_parse_accepts_date_only() {
        let line = r#"{"time":"2025-12-01","msg":"midnight"}"#;
        let rec = strict_parse(line).unwrap();
        assert_eq!(rec.time_ms, Some(1764547200000));
    }

    #[test]
    fn strict_parse_rejects_missing_time() {
        let line = r#"{"level":"info","msg":"no time here"}"#;
        assert!(strict_parse(line).is_none());
    }

    #[test]
    fn strict_parse_rejects_non_json() {
        assert!(strict_parse("not json at all").is_none());
    }

    #[test]
    fn strict_parse_rejects_blank() {
        assert!(strict_parse("   ").is_none());
        assert!(strict_parse("").is_none());
    }

    #[test]
    fn strict_parse_preserves_extra_keys() {
        let line = r#"{"time":"2025-12-01T00:00:00Z","msg":"x","request_id":"abc","count":3}"#;
        let rec = strict_parse(line).unwrap();
        assert_eq!(rec.extra.get("request_id").unwrap(), "abc");
        assert_eq!(rec.extra.get("count").unwrap(), 3);
        assert!(!rec.extra.contains_key("time"));
        assert!(!rec.extra.contains_key("msg"));
    }

    #[test]
    fn permissive_parse_synthesizes_stray_lines() {
        let rec = permissive_parse("panic: index out of bounds").unwrap();
        assert_eq!(rec.level.as_deref(), Some("info"));
        assert_eq!(rec.msg.as_deref(), Some("panic: index out of bounds"));
        assert!(rec.time.is_none());
        assert!(rec.is_strict(), "synthesized records carry a synthetic now()");
    }

    #[test]
    fn permissive_parse_keeps_json_without_valid_time() {
        let line = r#"{"level":"warn","msg":"no time field"}"#;
        let rec = permissive_parse(line).unwrap();
        assert_eq!(rec.level.as_deref(), Some("warn"));
        assert!(rec.time_ms.is_none());
    }

    #[test]
    fn permissive_parse_rejects_blank() {
        assert!(permissive_parse("").is_none());
        assert!(permissive_parse("\n").is_none());
    }

    #[test]
    fn time_grammar_accepts_space_separated() {
        assert!(parse_instant_ms("2025-12-14 09:00:00").is_some());
    }

    #[test]
    fn time_grammar_rejects_garbage() {
        assert!(parse_instant_ms("not a time").is_none());
    }
}
