//! Bounded per-event-type record store
//!
//! Two companion structures behind one mutex:
//! - a map from event-type name to cumulative counters (`EventRecord`)
//! - a fixed-capacity chronological ring of individual occurrences
//!   (`HistoryEntry`), oldest silently discarded on overflow
//!
//! The map is kept bounded by an eviction pass that runs at most once per
//! `cleanup_interval`: when the number of distinct event types exceeds
//! `max_records`, the oldest-by-last-seen records are dropped until the
//! ceiling is met. The history ring self-evicts independently.
//!
//! All reads return snapshot copies so no caller ever holds a reference
//! into the locked state.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::core::EventPriority;

/// Record store limits and cadences
#[derive(Debug, Clone)]
pub struct RecordStoreConfig {
    /// Ceiling on distinct event-type records
    pub max_records: usize,
    /// Capacity of the chronological history ring
    pub history_capacity: usize,
    /// Minimum interval between eviction passes
    pub cleanup_interval: Duration,
    /// Window for `recent_events` in statistics
    pub recent_window: Duration,
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self {
            max_records: 1000,
            history_capacity: 500,
            cleanup_interval: Duration::from_secs(30),
            recent_window: Duration::from_secs(60),
        }
    }
}

/// Cumulative counters for one event-type name.
///
/// Exactly one record exists per name; `count` is monotonically
/// non-decreasing until the record is cleared or evicted.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub name: String,
    /// Priority of the first occurrence (used for per-priority breakdowns)
    pub priority: EventPriority,
    /// Priority of the most recent occurrence
    pub last_priority: EventPriority,
    pub count: u64,
    pub first_seen: SystemTime,
    pub last_seen: SystemTime,
    /// Opaque payload of the most recent occurrence
    pub last_payload: Value,
}

/// One observed occurrence, as appended to the history ring
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub timestamp: SystemTime,
    pub name: String,
    pub priority: EventPriority,
    pub payload: Value,
}

/// A record that was last seen inside the recent window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentEvent {
    pub name: String,
    pub count: u64,
    pub seconds_ago: f64,
}

/// Snapshot of store-wide statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventStatistics {
    /// Number of distinct event-type records
    pub total_events: usize,
    /// Sum of all per-record counts
    pub total_count: u64,
    /// Event types per first-seen priority, keyed by priority name
    pub priority_breakdown: HashMap<String, usize>,
    /// Records last seen inside the recent window, most recent first
    pub recent_events: Vec<RecentEvent>,
}

struct StoreInner {
    records: HashMap<String, EventRecord>,
    history: VecDeque<HistoryEntry>,
    last_cleanup: Instant,
}

/// Bounded store of per-event-type records plus occurrence history
pub struct RecordStore {
    config: RecordStoreConfig,
    inner: Mutex<StoreInner>,
}

impl RecordStore {
    pub fn new(config: RecordStoreConfig) -> Self {
        let history = VecDeque::with_capacity(config.history_capacity);
        Self {
            config,
            inner: Mutex::new(StoreInner {
                records: HashMap::new(),
                history,
                last_cleanup: Instant::now(),
            }),
        }
    }

    /// Record one occurrence of `name`.
    ///
    /// Inserts or updates the event record, appends to the history ring,
    /// and runs the time-gated eviction check. O(1) amortized.
    pub fn record(&self, name: &str, priority: EventPriority, payload: Value) {
        let now = SystemTime::now();
        let mut inner = self.inner.lock();

        inner
            .records
            .entry(name.to_string())
            .and_modify(|record| {
                record.count += 1;
                record.last_seen = now;
                record.last_priority = priority;
                record.last_payload = payload.clone();
            })
            .or_insert_with(|| EventRecord {
                name: name.to_string(),
                priority,
                last_priority: priority,
                count: 1,
                first_seen: now,
                last_seen: now,
                last_payload: payload.clone(),
            });

        if inner.history.len() == self.config.history_capacity {
            inner.history.pop_front();
        }
        inner.history.push_back(HistoryEntry {
            timestamp: now,
            name: name.to_string(),
            priority,
            payload,
        });

        self.maybe_evict(&mut inner);
    }

    /// Eviction pass, gated to once per `cleanup_interval`
    fn maybe_evict(&self, inner: &mut StoreInner) {
        if inner.last_cleanup.elapsed() < self.config.cleanup_interval {
            return;
        }
        inner.last_cleanup = Instant::now();

        let excess = inner.records.len().saturating_sub(self.config.max_records);
        if excess == 0 {
            return;
        }

        let mut by_age: Vec<(String, SystemTime)> = inner
            .records
            .iter()
            .map(|(name, record)| (name.clone(), record.last_seen))
            .collect();
        by_age.sort_by_key(|(_, last_seen)| *last_seen);

        for (name, _) in by_age.into_iter().take(excess) {
            inner.records.remove(&name);
        }
        debug!(evicted = excess, "evicted stale event records");
    }

    /// Snapshot of all records
    pub fn get_all(&self) -> Vec<EventRecord> {
        self.inner.lock().records.values().cloned().collect()
    }

    /// Snapshot of the record for one event-type name
    pub fn get(&self, name: &str) -> Option<EventRecord> {
        self.inner.lock().records.get(name).cloned()
    }

    /// Records whose first-seen priority matches `priority`
    pub fn get_by_priority(&self, priority: EventPriority) -> Vec<EventRecord> {
        self.inner
            .lock()
            .records
            .values()
            .filter(|record| record.priority == priority)
            .cloned()
            .collect()
    }

    /// Records whose name contains `pattern`, case-insensitively
    pub fn get_by_name_substring(&self, pattern: &str) -> Vec<EventRecord> {
        let pattern = pattern.to_lowercase();
        self.inner
            .lock()
            .records
            .values()
            .filter(|record| record.name.to_lowercase().contains(&pattern))
            .cloned()
            .collect()
    }

    /// Most recent history entries, oldest first; all of them if `limit`
    /// is `None`
    pub fn history(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        let inner = self.inner.lock();
        let skip = limit
            .map(|l| inner.history.len().saturating_sub(l))
            .unwrap_or(0);
        inner.history.iter().skip(skip).cloned().collect()
    }

    /// History entries with `start <= timestamp <= end`
    pub fn history_between(&self, start: SystemTime, end: SystemTime) -> Vec<HistoryEntry> {
        self.inner
            .lock()
            .history
            .iter()
            .filter(|entry| entry.timestamp >= start && entry.timestamp <= end)
            .cloned()
            .collect()
    }

    /// Observed occurrences per second over the trailing recent window
    pub fn events_per_second(&self) -> f64 {
        let now = SystemTime::now();
        let window = self.config.recent_window;
        let recent = self
            .inner
            .lock()
            .history
            .iter()
            .filter(|entry| {
                now.duration_since(entry.timestamp)
                    .map(|age| age < window)
                    .unwrap_or(false)
            })
            .count();
        recent as f64 / window.as_secs_f64()
    }

    /// Store-wide statistics snapshot.
    ///
    /// `recent_events` holds records last seen inside the recent window,
    /// sorted by recency ascending (most recent first).
    pub fn statistics(&self) -> EventStatistics {
        let now = SystemTime::now();
        let inner = self.inner.lock();

        let mut priority_breakdown: HashMap<String, usize> = HashMap::new();
        let mut recent_events = Vec::new();
        let mut total_count = 0u64;

        for record in inner.records.values() {
            total_count += record.count;
            *priority_breakdown
                .entry(record.priority.as_str().to_string())
                .or_insert(0) += 1;

            if let Ok(age) = now.duration_since(record.last_seen) {
                if age < self.config.recent_window {
                    recent_events.push(RecentEvent {
                        name: record.name.clone(),
                        count: record.count,
                        seconds_ago: age.as_secs_f64(),
                    });
                }
            }
        }

        recent_events.sort_by(|a, b| {
            a.seconds_ago
                .partial_cmp(&b.seconds_ago)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        EventStatistics {
            total_events: inner.records.len(),
            total_count,
            priority_breakdown,
            recent_events,
        }
    }

    /// Number of distinct event-type records
    pub fn record_count(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Atomically empty both the record map and the history ring
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.records.clear();
        inner.history.clear();
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(RecordStoreConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> RecordStore {
        RecordStore::default()
    }

    #[test]
    fn test_count_matches_calls() {
        let store = store();
        for _ in 0..5 {
            store.record("tick", EventPriority::Normal, json!({"px": 1}));
        }
        store.record("fill", EventPriority::High, Value::Null);

        assert_eq!(store.get("tick").unwrap().count, 5);
        assert_eq!(store.get("fill").unwrap().count, 1);
        assert_eq!(store.record_count(), 2);
    }

    #[test]
    fn test_last_payload_and_priority_track_latest() {
        let store = store();
        store.record("tick", EventPriority::Normal, json!({"px": 1}));
        store.record("tick", EventPriority::High, json!({"px": 2}));

        let record = store.get("tick").unwrap();
        assert_eq!(record.priority, EventPriority::Normal);
        assert_eq!(record.last_priority, EventPriority::High);
        assert_eq!(record.last_payload, json!({"px": 2}));
    }

    #[test]
    fn test_history_ring_is_bounded_fifo() {
        let store = RecordStore::new(RecordStoreConfig {
            history_capacity: 3,
            ..RecordStoreConfig::default()
        });
        for i in 0..5 {
            store.record(&format!("e{i}"), EventPriority::Normal, Value::Null);
        }

        let history = store.history(None);
        assert_eq!(history.len(), 3);
        let names: Vec<&str> = history.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["e2", "e3", "e4"]);
    }

    #[test]
    fn test_history_limit_returns_most_recent() {
        let store = store();
        for i in 0..10 {
            store.record(&format!("e{i}"), EventPriority::Normal, Value::Null);
        }
        let tail = store.history(Some(2));
        let names: Vec<&str> = tail.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["e8", "e9"]);
    }

    #[test]
    fn test_substring_query_is_case_insensitive() {
        let store = store();
        store.record("market_data.tick", EventPriority::Normal, Value::Null);
        store.record("order.fill", EventPriority::High, Value::Null);

        let hits = store.get_by_name_substring("MARKET");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "market_data.tick");
    }

    #[test]
    fn test_statistics_scenario() {
        let store = store();
        for _ in 0..3 {
            store.record("tick", EventPriority::Normal, json!({"px": 1}));
        }

        let stats = store.statistics();
        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.priority_breakdown.get("NORMAL"), Some(&1));
        assert_eq!(stats.recent_events.len(), 1);
        assert_eq!(stats.recent_events[0].name, "tick");
        assert_eq!(stats.recent_events[0].count, 3);
        assert!(stats.recent_events[0].seconds_ago < 60.0);
    }

    #[test]
    fn test_clear_resets_to_baseline() {
        let store = store();
        store.record("tick", EventPriority::Normal, Value::Null);
        store.clear();

        let stats = store.statistics();
        assert_eq!(stats.total_events, 0);
        assert_eq!(stats.total_count, 0);
        assert!(stats.priority_breakdown.is_empty());
        assert!(stats.recent_events.is_empty());
        assert!(store.history(None).is_empty());
    }

    #[test]
    fn test_eviction_drops_oldest_by_last_seen() {
        let store = RecordStore::new(RecordStoreConfig {
            max_records: 2,
            cleanup_interval: Duration::ZERO,
            ..RecordStoreConfig::default()
        });

        store.record("old", EventPriority::Normal, Value::Null);
        std::thread::sleep(Duration::from_millis(5));
        store.record("mid", EventPriority::Normal, Value::Null);
        std::thread::sleep(Duration::from_millis(5));
        // This insert exceeds the ceiling; the eviction pass runs on the
        // next record call with an elapsed interval (zero here).
        store.record("new", EventPriority::Normal, Value::Null);

        assert!(store.record_count() <= 2);
        assert!(store.get("old").is_none());
        assert!(store.get("new").is_some());
    }

    #[test]
    fn test_eviction_gate_holds_within_interval() {
        let store = RecordStore::new(RecordStoreConfig {
            max_records: 1,
            cleanup_interval: Duration::from_secs(3600),
            ..RecordStoreConfig::default()
        });

        store.record("a", EventPriority::Normal, Value::Null);
        store.record("b", EventPriority::Normal, Value::Null);

        // Over the ceiling, but the interval has not elapsed
        assert_eq!(store.record_count(), 2);
    }
}
