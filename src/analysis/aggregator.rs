//! Event aggregation and statistics.
//!
//! This module provides the aggregate metrics computed over a loaded
//! [`EventTable`]. Every function is pure: it reads the table, allocates a
//! fresh result and leaves the table untouched, so each one can be re-run
//! independently.

use crate::error::{Error, Result};
use crate::models::{
    DailyVisitCounts, EventRecord, EventTable, Metrics, PageVisits, SessionDurationPolicy,
    SessionDurations, TopPages,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Default number of pages kept by [`top_pages`].
pub const DEFAULT_TOP_N: usize = 5;

/// Count events per calendar date. Counts rows, not distinct sessions.
pub fn daily_visits(table: &EventTable) -> DailyVisitCounts {
    let mut counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();

    for record in table.records() {
        *counts.entry(record.timestamp.date()).or_default() += 1;
    }

    counts.into()
}

/// Rank pages by event count and keep the first `n`.
///
/// Pages with equal counts keep the order in which they first appear in
/// the table.
pub fn top_pages(table: &EventTable, n: usize) -> TopPages {
    let mut ranked: Vec<PageVisits> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in table.records() {
        match index.get(record.page_url.as_str()) {
            Some(&i) => ranked[i].visits += 1,
            None => {
                index.insert(record.page_url.as_str(), ranked.len());
                ranked.push(PageVisits {
                    page_url: record.page_url.clone(),
                    visits: 1,
                });
            }
        }
    }

    // Stable sort keeps first-appearance order among ties
    ranked.sort_by_key(|p| std::cmp::Reverse(p.visits));
    ranked.truncate(n);

    ranked.into()
}

/// Compute one duration per distinct session using the given policy.
///
/// Under [`SessionDurationPolicy::MeanEventDuration`] a session without any
/// `event_duration` value has no duration and is left out.
pub fn session_durations(table: &EventTable, policy: SessionDurationPolicy) -> SessionDurations {
    let mut sessions: BTreeMap<String, Vec<&EventRecord>> = BTreeMap::new();

    for record in table.records() {
        sessions
            .entry(record.session_id.clone())
            .or_default()
            .push(record);
    }

    sessions
        .into_iter()
        .filter_map(|(session_id, events)| {
            let duration = match policy {
                SessionDurationPolicy::Span => Some(session_span(&events)),
                SessionDurationPolicy::MeanEventDuration => mean_event_duration(&events),
            };
            if duration.is_none() {
                warn!("Session {} has no event_duration values; skipped", session_id);
            }
            duration.map(|d| (session_id, d))
        })
        .collect::<BTreeMap<_, _>>()
        .into()
}

/// Mean of all session durations.
///
/// Returns [`Error::EmptyAggregate`] when the table holds no sessions.
pub fn average_session_duration(table: &EventTable, policy: SessionDurationPolicy) -> Result<f64> {
    session_durations(table, policy).mean().ok_or_else(|| {
        Error::EmptyAggregate("average session duration requested over zero sessions".to_string())
    })
}

/// Seconds between the first and last event of a session.
fn session_span(events: &[&EventRecord]) -> f64 {
    let bounds = events.iter().fold(
        None,
        |acc: Option<(NaiveDateTime, NaiveDateTime)>, e| match acc {
            Some((min, max)) => Some((min.min(e.timestamp), max.max(e.timestamp))),
            None => Some((e.timestamp, e.timestamp)),
        },
    );

    match bounds {
        Some((min, max)) => (max - min).num_milliseconds() as f64 / 1000.0,
        None => 0.0,
    }
}

/// Mean of the `event_duration` values present in a session.
fn mean_event_duration(events: &[&EventRecord]) -> Option<f64> {
    let values: Vec<f64> = events.iter().filter_map(|e| e.event_duration).collect();

    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Computes the full metrics snapshot under a fixed duration policy.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    policy: SessionDurationPolicy,
    top_n: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(SessionDurationPolicy::default(), DEFAULT_TOP_N)
    }
}

impl Aggregator {
    /// Create an aggregator. The policy cannot change afterwards.
    pub fn new(policy: SessionDurationPolicy, top_n: usize) -> Self {
        Self { policy, top_n }
    }

    pub fn policy(&self) -> SessionDurationPolicy {
        self.policy
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn daily_visits(&self, table: &EventTable) -> DailyVisitCounts {
        daily_visits(table)
    }

    pub fn top_pages(&self, table: &EventTable) -> TopPages {
        top_pages(table, self.top_n)
    }

    pub fn session_durations(&self, table: &EventTable) -> SessionDurations {
        session_durations(table, self.policy)
    }

    pub fn average_session_duration(&self, table: &EventTable) -> Result<f64> {
        average_session_duration(table, self.policy)
    }

    /// Compute every aggregate from the table.
    ///
    /// An empty table is not an error here: the snapshot records the
    /// missing average as `None` so the report can say so explicitly.
    pub fn metrics(&self, table: &EventTable) -> Metrics {
        let daily_visits = self.daily_visits(table);
        let top_pages = self.top_pages(table);
        let session_durations = self.session_durations(table);
        let average_session_duration = match self.average_session_duration(table) {
            Ok(avg) => Some(avg),
            Err(e) => {
                debug!("No average session duration: {}", e);
                None
            }
        };

        debug!(
            "Aggregated {} rows into {} days, {} pages, {} sessions",
            table.len(),
            daily_visits.len(),
            top_pages.len(),
            session_durations.len()
        );

        Metrics {
            session_duration_policy: self.policy,
            policy_version: self.policy.version(),
            total_visits: table.len() as u64,
            session_count: table.session_count(),
            daily_visits,
            top_pages,
            session_durations,
            average_session_duration,
        }
    }
}
