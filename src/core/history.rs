//! Per-instance transition history.
//!
//! Keeps the most recent committed events of an instance in order, so
//! registries can answer "how did this node get here" without a database.

use super::event::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Default number of events retained per instance.
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

/// Bounded, ordered log of committed events.
///
/// Once `capacity` is reached the oldest event is dropped for every new one.
///
/// # Example
///
/// ```rust
/// use fleetfsm::core::{Event, EventHistory};
/// use chrono::Utc;
///
/// let mut history = EventHistory::with_capacity(2);
/// for (old, new) in [("Unknown", "Configured"), ("Configured", "Operational")] {
///     history.record(Event {
///         name: "step".to_string(),
///         timestamp: Utc::now(),
///         instance_id: "node-1".to_string(),
///         old_state: old.to_string(),
///         new_state: new.to_string(),
///         old_substate: String::new(),
///         new_substate: String::new(),
///     });
/// }
///
/// assert_eq!(history.path(), vec!["Unknown", "Configured", "Operational"]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventHistory {
    events: VecDeque<Event>,
    capacity: usize,
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// A capacity of zero disables recording entirely.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity,
        }
    }

    pub fn record(&mut self, event: Event) {
        if self.capacity == 0 {
            return;
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Events oldest first.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.back()
    }

    /// Main states traversed: the first event's old state, then every new state.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(self.events.len() + 1);
        if let Some(first) = self.events.front() {
            path.push(first.old_state.as_str());
        }
        for event in &self.events {
            path.push(event.new_state.as_str());
        }
        path
    }

    /// Time between the first and last retained event.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.events.front()?, self.events.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    /// Events whose timestamp falls inside `[from, to]`. Either bound may be open.
    pub fn between(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| from.map_or(true, |f| e.timestamp >= f))
            .filter(|e| to.map_or(true, |t| e.timestamp <= t))
            .collect()
    }

    /// One page of events, newest first. `number` is zero-based.
    pub fn page(&self, size: usize, number: usize) -> Vec<&Event> {
        if size == 0 {
            return Vec::new();
        }
        self.events
            .iter()
            .rev()
            .skip(size.saturating_mul(number))
            .take(size)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(old: &str, new: &str, at: DateTime<Utc>) -> Event {
        Event {
            name: "test".to_string(),
            timestamp: at,
            instance_id: "node-1".to_string(),
            old_state: old.to_string(),
            new_state: new.to_string(),
            old_substate: String::new(),
            new_substate: String::new(),
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history = EventHistory::new();
        assert!(history.is_empty());
        assert!(history.path().is_empty());
        assert!(history.duration().is_none());
        assert_eq!(history.capacity(), DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn path_follows_recorded_states() {
        let now = Utc::now();
        let mut history = EventHistory::new();
        history.record(event("Unknown", "Configured", now));
        history.record(event("Configured", "Operational", now));

        assert_eq!(history.path(), vec!["Unknown", "Configured", "Operational"]);
        assert_eq!(history.last().unwrap().new_state, "Operational");
    }

    #[test]
    fn capacity_evicts_oldest() {
        let now = Utc::now();
        let mut history = EventHistory::with_capacity(2);
        history.record(event("A", "B", now));
        history.record(event("B", "C", now));
        history.record(event("C", "D", now));

        assert_eq!(history.len(), 2);
        assert_eq!(history.path(), vec!["B", "C", "D"]);
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut history = EventHistory::with_capacity(0);
        history.record(event("A", "B", Utc::now()));
        assert!(history.is_empty());
    }

    #[test]
    fn duration_spans_first_to_last() {
        let start = Utc::now();
        let mut history = EventHistory::new();
        history.record(event("A", "B", start));
        history.record(event("B", "C", start + chrono::Duration::seconds(5)));

        assert_eq!(history.duration(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn between_filters_by_time() {
        let start = Utc::now();
        let mut history = EventHistory::new();
        for i in 0..5 {
            history.record(event("A", "B", start + chrono::Duration::seconds(i)));
        }

        let window = history.between(
            Some(start + chrono::Duration::seconds(1)),
            Some(start + chrono::Duration::seconds(3)),
        );
        assert_eq!(window.len(), 3);
        assert_eq!(history.between(None, None).len(), 5);
    }

    #[test]
    fn pages_are_newest_first() {
        let now = Utc::now();
        let mut history = EventHistory::new();
        for state in ["B", "C", "D", "E", "F"] {
            history.record(event("A", state, now));
        }

        let first: Vec<_> = history.page(2, 0).iter().map(|e| e.new_state.as_str()).collect();
        let last: Vec<_> = history.page(2, 2).iter().map(|e| e.new_state.as_str()).collect();

        assert_eq!(first, vec!["F", "E"]);
        assert_eq!(last, vec!["B"]);
        assert!(history.page(2, 3).is_empty());
        assert!(history.page(0, 0).is_empty());
    }
}
