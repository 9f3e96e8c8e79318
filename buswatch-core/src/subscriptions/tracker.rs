//! Fingerprint-keyed subscription state machine

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::{Contract, EventPriority};
use crate::subscriptions::{
    classify, Fingerprint, LifecycleAction, SubscriptionKind, SubscriptionState,
};

/// One tracked logical subscription
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub fingerprint: Fingerprint,
    pub kind: SubscriptionKind,
    pub contract: Contract,
    pub state: SubscriptionState,
    pub created: SystemTime,
    pub last_update: SystemTime,
    pub error_count: u32,
    pub last_error: Option<String>,
    /// Lifecycle events observed for this key after creation
    pub data_count: u64,
    pub last_payload: Option<Value>,
    /// Priority declared on the start event that created the record
    pub priority: EventPriority,
}

impl Subscription {
    /// Whether this subscription should be treated as live.
    ///
    /// `Pending` counts as alive: a single subscribe never reaches `Active`
    /// (promotion needs a second start event), so liveness queries must not
    /// under-count freshly started subscriptions.
    pub fn is_alive(&self) -> bool {
        matches!(
            self.state,
            SubscriptionState::Pending | SubscriptionState::Active
        )
    }
}

/// Aggregate counters, recomputed on every mutating transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionCounts {
    pub total: usize,
    pub active: usize,
}

struct TrackerInner {
    subscriptions: HashMap<Fingerprint, Subscription>,
    counts: SubscriptionCounts,
}

/// Tracks subscription lifecycles keyed by contract fingerprint
pub struct SubscriptionTracker {
    inner: Mutex<TrackerInner>,
}

impl SubscriptionTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                subscriptions: HashMap::new(),
                counts: SubscriptionCounts::default(),
            }),
        }
    }

    /// Feed one bus event through the lifecycle pattern table.
    ///
    /// Returns `true` when the event matched a pattern (whether or not it
    /// changed any state). Non-matching events are a no-op.
    pub fn observe(&self, event_name: &str, priority: EventPriority, payload: &Value) -> bool {
        let Some((kind, action)) = classify(event_name) else {
            return false;
        };

        let contract = Contract::from_payload(payload);
        let fingerprint = Fingerprint::derive(kind, &contract);
        let now = SystemTime::now();

        let mut inner = self.inner.lock();
        match action {
            LifecycleAction::Start => {
                match inner.subscriptions.entry(fingerprint.clone()) {
                    Entry::Occupied(mut entry) => {
                        // Re-subscribe is implicit recovery
                        let sub = entry.get_mut();
                        sub.state = SubscriptionState::Active;
                        sub.error_count = 0;
                        sub.last_error = None;
                        sub.data_count += 1;
                        sub.last_payload = Some(payload.clone());
                        sub.last_update = now;
                        debug!(fingerprint = %sub.fingerprint, "subscription re-activated");
                    }
                    Entry::Vacant(entry) => {
                        info!(fingerprint = %fingerprint, kind = kind.as_str(),
                              "new subscription started");
                        entry.insert(Subscription {
                            fingerprint,
                            kind,
                            contract,
                            state: SubscriptionState::Pending,
                            created: now,
                            last_update: now,
                            error_count: 0,
                            last_error: None,
                            data_count: 0,
                            last_payload: Some(payload.clone()),
                            priority,
                        });
                    }
                }
            }
            LifecycleAction::End => {
                let Some(sub) = inner.subscriptions.get_mut(&fingerprint) else {
                    // Unsubscribe for a key never started: nothing to attach
                    return true;
                };
                sub.state = SubscriptionState::Cancelled;
                sub.data_count += 1;
                sub.last_payload = Some(payload.clone());
                sub.last_update = now;
                info!(fingerprint = %sub.fingerprint, "subscription ended");
            }
            LifecycleAction::Error => {
                let Some(sub) = inner.subscriptions.get_mut(&fingerprint) else {
                    return true;
                };
                sub.state = SubscriptionState::Error;
                sub.error_count += 1;
                sub.last_error = Some(extract_error_message(payload));
                sub.data_count += 1;
                sub.last_payload = Some(payload.clone());
                sub.last_update = now;
                warn!(fingerprint = %sub.fingerprint, errors = sub.error_count,
                      "subscription error");
            }
        }

        let counts = SubscriptionCounts {
            total: inner.subscriptions.len(),
            active: inner
                .subscriptions
                .values()
                .filter(|sub| sub.state == SubscriptionState::Active)
                .count(),
        };
        inner.counts = counts;
        true
    }

    /// Snapshot of all tracked subscriptions
    pub fn get_all(&self) -> Vec<Subscription> {
        self.inner.lock().subscriptions.values().cloned().collect()
    }

    /// Snapshot of one subscription by fingerprint
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Subscription> {
        self.inner.lock().subscriptions.get(fingerprint).cloned()
    }

    pub fn get_by_kind(&self, kind: SubscriptionKind) -> Vec<Subscription> {
        self.inner
            .lock()
            .subscriptions
            .values()
            .filter(|sub| sub.kind == kind)
            .cloned()
            .collect()
    }

    pub fn get_by_state(&self, state: SubscriptionState) -> Vec<Subscription> {
        self.inner
            .lock()
            .subscriptions
            .values()
            .filter(|sub| sub.state == state)
            .cloned()
            .collect()
    }

    /// Current aggregate counters
    pub fn counts(&self) -> SubscriptionCounts {
        self.inner.lock().counts
    }

    /// Drop every tracked subscription
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.subscriptions.clear();
        inner.counts = SubscriptionCounts::default();
    }
}

impl Default for SubscriptionTracker {
    fn default() -> Self {
        Self::new()
    }
}

// Error payloads spell their message as `errorString` (broker wire name)
// or `error`; anything else reports as unknown.
fn extract_error_message(payload: &Value) -> String {
    payload
        .get("errorString")
        .or_else(|| payload.get("error"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string()
}
