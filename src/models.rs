//! Data models for the event log and its aggregates.
//!
//! This module contains the loaded event table and the read-only aggregate
//! snapshots computed from it. Aggregates are created fresh for every
//! analysis call and are never mutated afterwards.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Kind of interaction recorded in the event log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    View,
    Click,
    Scroll,
    Submit,
    /// Any value outside the known set. Kept rather than rejected.
    Other(String),
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::View => write!(f, "view"),
            EventType::Click => write!(f, "click"),
            EventType::Scroll => write!(f, "scroll"),
            EventType::Submit => write!(f, "submit"),
            EventType::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "view" | "page_view" | "pageview" => EventType::View,
            "click" => EventType::Click,
            "scroll" => EventType::Scroll,
            "submit" => EventType::Submit,
            other => EventType::Other(other.to_string()),
        }
    }
}

/// One row of the source event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    /// Opaque user identifier, if the log carries one.
    pub user_id: Option<String>,
    /// Opaque session identifier. Never parsed for an embedded user id.
    pub session_id: String,
    /// Path-like page address.
    pub page_url: String,
    /// Timezone-naive event time.
    pub timestamp: NaiveDateTime,
    /// Interaction kind, if the log carries one.
    pub event_type: Option<EventType>,
    /// Seconds the interaction lasted. Negative values are preserved.
    pub event_duration: Option<f64>,
}

/// Immutable in-memory table of event records, in source order.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    records: Vec<EventRecord>,
}

impl EventTable {
    /// Wrap loaded records. The table cannot be modified afterwards.
    pub fn new(records: Vec<EventRecord>) -> Self {
        Self { records }
    }

    /// All records in source order.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct session ids.
    pub fn session_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.session_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// How a session's duration is defined.
///
/// The two definitions measure different things and are never mixed: the
/// policy is fixed when the aggregator is constructed and is recorded in
/// every metrics snapshot it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionDurationPolicy {
    /// `max(timestamp) - min(timestamp)` within the session.
    #[default]
    Span,
    /// Mean of the session's own `event_duration` values.
    MeanEventDuration,
}

impl SessionDurationPolicy {
    /// Versioned identifier of the definition.
    pub fn version(&self) -> &'static str {
        match self {
            SessionDurationPolicy::Span => "span/v1",
            SessionDurationPolicy::MeanEventDuration => "mean-event-duration/v1",
        }
    }

    /// Short human-readable description used in the report.
    pub fn description(&self) -> &'static str {
        match self {
            SessionDurationPolicy::Span => "time between first and last event",
            SessionDurationPolicy::MeanEventDuration => "average event duration",
        }
    }

    /// Whether the loader must insist on the `event_duration` column.
    pub fn requires_event_duration(&self) -> bool {
        matches!(self, SessionDurationPolicy::MeanEventDuration)
    }
}

impl fmt::Display for SessionDurationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version())
    }
}

/// Event count per calendar date, in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyVisitCounts(BTreeMap<NaiveDate, u64>);

impl DailyVisitCounts {
    /// Iterate `(date, count)` pairs chronologically.
    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &u64)> {
        self.0.iter()
    }

    /// Count for a single date.
    pub fn get(&self, date: &NaiveDate) -> Option<u64> {
        self.0.get(date).copied()
    }

    /// Number of distinct dates.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Grand total of events over all dates.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Busiest date (earliest one on ties).
    pub fn busiest(&self) -> Option<(NaiveDate, u64)> {
        self.0
            .iter()
            .fold(None, |best: Option<(NaiveDate, u64)>, (date, count)| match best {
                Some((_, c)) if c >= *count => best,
                _ => Some((*date, *count)),
            })
    }

    /// Quietest date (earliest one on ties).
    pub fn quietest(&self) -> Option<(NaiveDate, u64)> {
        self.0
            .iter()
            .fold(None, |best: Option<(NaiveDate, u64)>, (date, count)| match best {
                Some((_, c)) if c <= *count => best,
                _ => Some((*date, *count)),
            })
    }
}

impl From<BTreeMap<NaiveDate, u64>> for DailyVisitCounts {
    fn from(map: BTreeMap<NaiveDate, u64>) -> Self {
        Self(map)
    }
}

impl Serialize for DailyVisitCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(date, count)| (date.to_string(), count)))
    }
}

/// A page and the number of events recorded against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageVisits {
    pub page_url: String,
    pub visits: u64,
}

/// Most visited pages, count descending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TopPages(Vec<PageVisits>);

impl TopPages {
    pub fn iter(&self) -> std::slice::Iter<'_, PageVisits> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[PageVisits] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Highest count, or 0 when empty.
    pub fn max_visits(&self) -> u64 {
        self.0.first().map(|p| p.visits).unwrap_or(0)
    }
}

impl From<Vec<PageVisits>> for TopPages {
    fn from(pages: Vec<PageVisits>) -> Self {
        Self(pages)
    }
}

/// Duration in seconds per session id, ordered by session id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SessionDurations(BTreeMap<String, f64>);

impl SessionDurations {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn get(&self, session_id: &str) -> Option<f64> {
        self.0.get(session_id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Arithmetic mean, or `None` when there are no sessions.
    pub fn mean(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0.values().sum::<f64>() / self.0.len() as f64)
    }
}

impl From<BTreeMap<String, f64>> for SessionDurations {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}

/// Snapshot of every aggregate computed from one event table.
///
/// Both the chart renderer and the report text read from the same snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    /// Definition used for `session_durations`.
    pub session_duration_policy: SessionDurationPolicy,
    /// Versioned name of the policy.
    pub policy_version: &'static str,
    /// Number of rows in the source table.
    pub total_visits: u64,
    pub daily_visits: DailyVisitCounts,
    pub top_pages: TopPages,
    pub session_count: usize,
    pub session_durations: SessionDurations,
    /// Mean session duration; `None` when the table has no sessions.
    pub average_session_duration: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_event_type_from_str() {
        assert_eq!(EventType::from("view"), EventType::View);
        assert_eq!(EventType::from("CLICK"), EventType::Click);
        assert_eq!(EventType::from(" scroll "), EventType::Scroll);
        assert_eq!(
            EventType::from("hover"),
            EventType::Other("hover".to_string())
        );
    }

    #[test]
    fn test_policy_versions() {
        assert_eq!(SessionDurationPolicy::default(), SessionDurationPolicy::Span);
        assert_eq!(SessionDurationPolicy::Span.version(), "span/v1");
        assert!(SessionDurationPolicy::MeanEventDuration.requires_event_duration());
        assert!(!SessionDurationPolicy::Span.requires_event_duration());
    }

    #[test]
    fn test_daily_visits_extremes() {
        let counts: DailyVisitCounts = [
            (date("2024-01-01"), 5),
            (date("2024-01-02"), 2),
            (date("2024-01-03"), 5),
            (date("2024-01-04"), 2),
        ]
        .into_iter()
        .collect::<BTreeMap<_, _>>()
        .into();

        assert_eq!(counts.total(), 14);
        assert_eq!(counts.busiest(), Some((date("2024-01-01"), 5)));
        assert_eq!(counts.quietest(), Some((date("2024-01-02"), 2)));
        assert_eq!(DailyVisitCounts::default().busiest(), None);
    }

    #[test]
    fn test_daily_visits_serialize_as_date_keys() {
        let counts: DailyVisitCounts = [(date("2024-01-02"), 1), (date("2024-01-01"), 2)]
            .into_iter()
            .collect::<BTreeMap<_, _>>()
            .into();

        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"2024-01-01":2,"2024-01-02":1}"#);
    }

    #[test]
    fn test_session_durations_mean() {
        assert_eq!(SessionDurations::default().mean(), None);

        let durations: SessionDurations = [("s1".to_string(), 300.0), ("s2".to_string(), 0.0)]
            .into_iter()
            .collect::<BTreeMap<_, _>>()
            .into();
        assert_eq!(durations.mean(), Some(150.0));
    }
}
