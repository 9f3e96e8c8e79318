//! The event-bus seam and the monitoring decorator
//!
//! The host application already has a bus; buswatch only needs its emit
//! entry point. [`EventBus`] is that seam. [`MonitoredBus`] wraps any
//! implementation at wiring time and observes every emit before delegating
//! — composition, not runtime mutation of the bus object.
//!
//! [`LocalBus`] is a minimal synchronous dispatcher used by the demo
//! binaries and integration tests; production hosts wrap their own bus.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::error;

use crate::core::EventPriority;
use crate::monitor::BusMonitor;

/// The emit entry point buswatch wraps.
///
/// Returns the number of handlers the event was delivered to (bus
/// implementations without that notion may return 0).
pub trait EventBus: Send + Sync {
    fn emit(&self, event_name: &str, payload: Value, priority: EventPriority) -> usize;
}

type Handler = dyn Fn(&Value, EventPriority) + Send + Sync;

/// Synchronous in-process dispatcher: handlers run on the emitting thread,
/// in registration order.
#[derive(Default)]
pub struct LocalBus {
    handlers: RwLock<HashMap<String, Vec<Arc<Handler>>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `event_name`
    pub fn on(&self, event_name: &str, handler: impl Fn(&Value, EventPriority) + Send + Sync + 'static) {
        self.handlers
            .write()
            .entry(event_name.to_string())
            .or_default()
            .push(Arc::new(handler));
    }
}

impl EventBus for LocalBus {
    fn emit(&self, event_name: &str, payload: Value, priority: EventPriority) -> usize {
        // Copy the handler list under the lock, invoke outside it
        let handlers: Vec<Arc<Handler>> = self
            .handlers
            .read()
            .get(event_name)
            .cloned()
            .unwrap_or_default();

        for handler in &handlers {
            handler(&payload, priority);
        }
        handlers.len()
    }
}

/// Decorator that records every emit before delegating to the inner bus.
///
/// Wrap exactly once, at system wiring time. Wrapping an already-wrapped
/// bus records every event twice; nothing prevents it, so don't.
pub struct MonitoredBus<B: EventBus> {
    inner: B,
    monitor: Arc<BusMonitor>,
}

impl<B: EventBus> MonitoredBus<B> {
    pub fn new(inner: B, monitor: Arc<BusMonitor>) -> Self {
        Self { inner, monitor }
    }

    pub fn monitor(&self) -> &Arc<BusMonitor> {
        &self.monitor
    }

    /// Unwrap, dropping the monitoring layer
    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B: EventBus> EventBus for MonitoredBus<B> {
    fn emit(&self, event_name: &str, payload: Value, priority: EventPriority) -> usize {
        // Observation must never prevent delivery: any recording failure is
        // logged and swallowed, then the inner bus gets the event untouched
        let observed = catch_unwind(AssertUnwindSafe(|| {
            self.monitor.observe(event_name, priority, &payload);
        }));
        if observed.is_err() {
            error!(event = event_name, "error while recording event; delivering anyway");
        }

        self.inner.emit(event_name, payload, priority)
    }
}
