//! Event log loading.
//!
//! Reads a delimited event log into an immutable [`EventTable`]. Validation
//! is shallow: required columns must exist and every row needs a session id
//! and a parseable timestamp, but values such as negative durations are kept
//! as they are. `event_duration` is only enforced when it is a required
//! column; otherwise unreadable values are dropped with a warning.

use crate::error::{Error, Result};
use crate::models::{EventRecord, EventTable, EventType, SessionDurationPolicy};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Accepted timestamp layouts, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Columns every event log must carry.
pub const BASE_COLUMNS: &[&str] = &["session_id", "page_url", "timestamp"];

/// Row shape as it appears in the source file.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    user_id: Option<String>,
    session_id: String,
    page_url: String,
    timestamp: String,
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default)]
    event_duration: Option<String>,
}

/// Loader for delimited event logs.
#[derive(Debug, Clone)]
pub struct EventLoader {
    delimiter: u8,
    required: Vec<&'static str>,
}

impl Default for EventLoader {
    fn default() -> Self {
        Self {
            delimiter: b',',
            required: BASE_COLUMNS.to_vec(),
        }
    }
}

impl EventLoader {
    /// Create a loader for comma-separated logs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader whose required columns match a session policy.
    pub fn for_policy(policy: SessionDurationPolicy) -> Self {
        let mut loader = Self::default();
        if policy.requires_event_duration() {
            loader.required.push("event_duration");
        }
        loader
    }

    /// Use a different field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Columns this loader insists on.
    pub fn required_columns(&self) -> &[&'static str] {
        &self.required
    }

    /// Load an event log from a file path.
    pub fn load_path(&self, path: &Path) -> Result<EventTable> {
        info!("Loading event log: {}", path.display());
        let file = std::fs::File::open(path)?;
        self.load_reader(file)
    }

    /// Load an event log from any byte stream.
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<EventTable> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let missing: Vec<&str> = self
            .required
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .collect();

        if !missing.is_empty() {
            return Err(Error::DataFormat(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        let strict_duration = self.required.contains(&"event_duration");
        let mut records = Vec::new();
        for row in csv_reader.records() {
            let row = row?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);
            let raw: RawRecord = row
                .deserialize(Some(&headers))
                .map_err(|e| Error::DataFormat(format!("line {}: {}", line, e)))?;
            records.push(into_record(raw, line, strict_duration)?);
        }

        debug!("Loaded {} event records", records.len());
        Ok(EventTable::new(records))
    }
}

/// Convert a raw row, enforcing the per-row invariants.
fn into_record(raw: RawRecord, line: u64, strict_duration: bool) -> Result<EventRecord> {
    if raw.session_id.is_empty() {
        return Err(Error::DataFormat(format!("line {}: empty session_id", line)));
    }

    let timestamp = parse_timestamp(&raw.timestamp).ok_or_else(|| {
        Error::DataFormat(format!(
            "line {}: unparseable timestamp '{}'",
            line, raw.timestamp
        ))
    })?;

    let event_duration = parse_duration(raw.event_duration.as_deref(), line, strict_duration)?;

    Ok(EventRecord {
        user_id: raw.user_id.filter(|u| !u.is_empty()),
        session_id: raw.session_id,
        page_url: raw.page_url,
        timestamp,
        event_type: raw
            .event_type
            .filter(|t| !t.is_empty())
            .map(|t| EventType::from(t.as_str())),
        event_duration,
    })
}

/// Read an `event_duration` cell. Strict mode rejects empty and non-numeric
/// cells; lenient mode maps them to `None`.
fn parse_duration(value: Option<&str>, line: u64, strict: bool) -> Result<Option<f64>> {
    let value = value.unwrap_or("");

    if value.is_empty() {
        if strict {
            return Err(Error::DataFormat(format!(
                "line {}: missing event_duration",
                line
            )));
        }
        return Ok(None);
    }

    match value.parse::<f64>() {
        Ok(duration) if duration.is_finite() => Ok(Some(duration)),
        _ if strict => Err(Error::DataFormat(format!(
            "line {}: invalid event_duration '{}'",
            line, value
        ))),
        _ => {
            warn!("line {}: ignoring invalid event_duration '{}'", line, value);
            Ok(None)
        }
    }
}

/// Parse a timezone-naive timestamp.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Load a log with the default loader for a policy.
pub fn load(path: &Path, policy: SessionDurationPolicy) -> Result<EventTable> {
    EventLoader::for_policy(policy).load_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
user_id,session_id,page_url,timestamp,event_type,event_duration
u1,u1_s1,/home,2024-01-01 10:00:00,view,12.5
u1,u1_s1,/cart,2024-01-01 10:05:00,click,-3
u2,u2_s1,/home,2024-01-02 09:00:00,hover,
";

    #[test]
    fn test_load_sample() {
        let table = EventLoader::new().load_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.session_count(), 2);

        let first = &table.records()[0];
        assert_eq!(first.user_id.as_deref(), Some("u1"));
        assert_eq!(first.session_id, "u1_s1");
        assert_eq!(first.event_type, Some(EventType::View));
        assert_eq!(first.event_duration, Some(12.5));
        assert_eq!(
            first.timestamp,
            parse_timestamp("2024-01-01 10:00:00").unwrap()
        );
    }

    #[test]
    fn test_negative_duration_preserved() {
        let table = EventLoader::new().load_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.records()[1].event_duration, Some(-3.0));
        assert_eq!(table.records()[2].event_duration, None);
        assert_eq!(
            table.records()[2].event_type,
            Some(EventType::Other("hover".to_string()))
        );
    }

    #[test]
    fn test_minimal_columns() {
        let csv = "session_id,page_url,timestamp\ns1,/home,2024-01-01 10:00:00\n";
        let table = EventLoader::new().load_reader(csv.as_bytes()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].user_id, None);
        assert_eq!(table.records()[0].event_type, None);
    }

    #[test]
    fn test_missing_column_fails() {
        let csv = "session_id,page_url\ns1,/home\n";
        let err = EventLoader::new().load_reader(csv.as_bytes()).unwrap_err();

        match err {
            Error::DataFormat(msg) => assert!(msg.contains("timestamp")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_mean_policy_requires_event_duration() {
        let csv = "session_id,page_url,timestamp\ns1,/home,2024-01-01 10:00:00\n";
        let loader = EventLoader::for_policy(SessionDurationPolicy::MeanEventDuration);

        assert!(loader.required_columns().contains(&"event_duration"));
        assert!(matches!(
            loader.load_reader(csv.as_bytes()),
            Err(Error::DataFormat(_))
        ));
    }

    #[test]
    fn test_mean_policy_rejects_empty_duration() {
        let csv = "\
session_id,page_url,timestamp,event_duration
s1,/home,2024-01-01 10:00:00,
s2,/a,2024-01-01 11:00:00,10
";
        let err = EventLoader::for_policy(SessionDurationPolicy::MeanEventDuration)
            .load_reader(csv.as_bytes())
            .unwrap_err();

        match err {
            Error::DataFormat(msg) => {
                assert!(msg.contains("line 2"));
                assert!(msg.contains("event_duration"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_mean_policy_rejects_non_numeric_duration() {
        let csv = "session_id,page_url,timestamp,event_duration\ns1,/home,2024-01-01 10:00:00,12s\n";
        let err = EventLoader::for_policy(SessionDurationPolicy::MeanEventDuration)
            .load_reader(csv.as_bytes())
            .unwrap_err();
        assert!(matches!(err, Error::DataFormat(msg) if msg.contains("12s")));
    }

    #[test]
    fn test_span_policy_ignores_bad_duration() {
        let csv = "\
session_id,page_url,timestamp,event_duration
s1,/home,2024-01-01 10:00:00,N/A
s1,/cart,2024-01-01 10:01:00,4.5
";
        let table = EventLoader::for_policy(SessionDurationPolicy::Span)
            .load_reader(csv.as_bytes())
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].event_duration, None);
        assert_eq!(table.records()[1].event_duration, Some(4.5));
    }

    #[test]
    fn test_bad_timestamp_fails() {
        let csv = "session_id,page_url,timestamp\ns1,/home,2024-01-01 10:00:00\ns1,/a,yesterday\n";
        let err = EventLoader::new().load_reader(csv.as_bytes()).unwrap_err();

        match err {
            Error::DataFormat(msg) => {
                assert!(msg.contains("yesterday"));
                assert!(msg.contains("line 3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_session_id_fails() {
        let csv = "session_id,page_url,timestamp\n,/home,2024-01-01 10:00:00\n";
        assert!(matches!(
            EventLoader::new().load_reader(csv.as_bytes()),
            Err(Error::DataFormat(_))
        ));
    }

    #[test]
    fn test_custom_delimiter() {
        let tsv = "session_id\tpage_url\ttimestamp\ns1\t/home\t2024-01-01 10:00:00\n";
        let table = EventLoader::new()
            .with_delimiter(b'\t')
            .load_reader(tsv.as_bytes())
            .unwrap();
        assert_eq!(table.records()[0].page_url, "/home");
    }

    #[test]
    fn test_header_only_gives_empty_table() {
        let csv = "session_id,page_url,timestamp\n";
        let table = EventLoader::new().load_reader(csv.as_bytes()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2024-01-01 10:00:00").is_some());
        assert!(parse_timestamp("2024-01-01 10:00:00.250").is_some());
        assert!(parse_timestamp("2024-01-01T10:00:00").is_some());
        assert!(parse_timestamp("01/01/2024").is_none());
    }

    #[test]
    fn test_load_path_missing_file() {
        let err = EventLoader::new()
            .load_path(Path::new("/nonexistent/events.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
