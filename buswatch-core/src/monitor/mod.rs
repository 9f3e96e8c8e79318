//! The `BusMonitor` facade
//!
//! One explicitly constructed object owns all four stores and the callback
//! registry. There is no ambient global: whoever wires the system creates
//! the monitor, hands an `Arc` of it to the bus decorator and the GUI, and
//! calls [`BusMonitor::cleanup`] at teardown.
//!
//! Update callbacks fire after every recorded event and after clears. The
//! callback list is copied under its lock and invoked outside it, each
//! callback isolated, so a slow or panicking callback can neither stall
//! producers nor starve its peers.

pub mod report;

pub use report::{classify_trend, MonitorReport, Trend};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{error, info};

use crate::core::{EventPriority, MonitorError};
use crate::logs::{
    ConnectionState, ConnectionSummary, EventFlowSummary, LogPipeline, LogPipelineConfig,
    ModuleStats, PipelineStats,
};
use crate::memory::{
    MemoryConfig, MemoryReader, MemorySample, MemorySummary, MemoryTrendDetector,
};
use crate::records::{
    EventRecord, EventStatistics, HistoryEntry, RecordStore, RecordStoreConfig,
};
use crate::subscriptions::{
    Fingerprint, Subscription, SubscriptionCounts, SubscriptionKind, SubscriptionState,
    SubscriptionTracker,
};

/// Capacities and thresholds for every store the monitor owns
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    pub records: RecordStoreConfig,
    pub memory: MemoryConfig,
    pub pipeline: LogPipelineConfig,
}

/// Handle returned by callback registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

type UpdateCallback = dyn Fn() + Send + Sync;

/// Owns the record store, subscription tracker, memory detector, and log
/// pipeline; exposes the full query/mutation/logging surface.
pub struct BusMonitor {
    records: RecordStore,
    subscriptions: SubscriptionTracker,
    memory: MemoryTrendDetector,
    pipeline: LogPipeline,
    callbacks: Mutex<Vec<(CallbackId, Arc<UpdateCallback>)>>,
    next_callback_id: AtomicU64,
}

impl BusMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self::assemble(config, None)
    }

    /// Construct with a custom memory reader (tests, exotic platforms)
    pub fn with_memory_reader(config: MonitorConfig, reader: Box<dyn MemoryReader>) -> Self {
        Self::assemble(config, Some(reader))
    }

    fn assemble(config: MonitorConfig, reader: Option<Box<dyn MemoryReader>>) -> Self {
        let memory = match reader {
            Some(reader) => MemoryTrendDetector::with_reader(config.memory, reader),
            None => MemoryTrendDetector::new(config.memory),
        };
        info!("bus monitor initialized");
        Self {
            records: RecordStore::new(config.records),
            subscriptions: SubscriptionTracker::new(),
            memory,
            pipeline: LogPipeline::new(config.pipeline),
            callbacks: Mutex::new(Vec::new()),
            next_callback_id: AtomicU64::new(1),
        }
    }

    /// Record one emitted event: update the record store, feed the
    /// subscription tracker, then notify update callbacks.
    ///
    /// This is the interception path; callers on the emit path treat any
    /// failure here as non-fatal.
    pub fn observe(&self, event_name: &str, priority: EventPriority, payload: &Value) {
        self.records.record(event_name, priority, payload.clone());
        self.subscriptions.observe(event_name, priority, payload);
        self.notify_callbacks();
    }

    // ---- query surface: records -------------------------------------

    pub fn event_records(&self) -> Vec<EventRecord> {
        self.records.get_all()
    }

    pub fn event_record(&self, name: &str) -> Option<EventRecord> {
        self.records.get(name)
    }

    pub fn events_by_priority(&self, priority: EventPriority) -> Vec<EventRecord> {
        self.records.get_by_priority(priority)
    }

    pub fn events_by_name_substring(&self, pattern: &str) -> Vec<EventRecord> {
        self.records.get_by_name_substring(pattern)
    }

    pub fn event_history(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        self.records.history(limit)
    }

    pub fn event_history_between(&self, start: SystemTime, end: SystemTime) -> Vec<HistoryEntry> {
        self.records.history_between(start, end)
    }

    pub fn statistics(&self) -> EventStatistics {
        self.records.statistics()
    }

    // ---- query surface: subscriptions -------------------------------

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.get_all()
    }

    pub fn subscription(&self, fingerprint: &Fingerprint) -> Option<Subscription> {
        self.subscriptions.get(fingerprint)
    }

    pub fn subscriptions_by_kind(&self, kind: SubscriptionKind) -> Vec<Subscription> {
        self.subscriptions.get_by_kind(kind)
    }

    pub fn subscriptions_by_state(&self, state: SubscriptionState) -> Vec<Subscription> {
        self.subscriptions.get_by_state(state)
    }

    pub fn subscription_counts(&self) -> SubscriptionCounts {
        self.subscriptions.counts()
    }

    // ---- query surface: memory and pipeline -------------------------

    /// Take a memory sample now (drives the trend detector)
    pub fn sample_memory(&self) -> MemorySample {
        self.memory.sample()
    }

    pub fn memory_summary(&self) -> Option<MemorySummary> {
        self.memory.summary()
    }

    pub fn event_flow_summary(&self, window_minutes: u64) -> EventFlowSummary {
        self.pipeline.event_flow_summary(window_minutes)
    }

    pub fn performance_summary(
        &self,
        module: Option<&str>,
    ) -> std::collections::HashMap<String, ModuleStats> {
        self.pipeline.performance_summary(module)
    }

    pub fn connection_summary(&self) -> ConnectionSummary {
        self.pipeline.connection_summary()
    }

    pub fn pipeline_stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    /// Combined snapshot across all stores
    pub fn report(&self) -> MonitorReport {
        let rss_series: Vec<f64> = self.memory.samples().iter().map(|s| s.rss_mb).collect();
        MonitorReport {
            statistics: self.records.statistics(),
            subscriptions: self.subscriptions.counts(),
            memory: self.memory.summary(),
            memory_trend: classify_trend(&rss_series),
            events_per_second: self.records.events_per_second(),
            pipeline: self.pipeline.stats(),
        }
    }

    // ---- logging surface --------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn log_event_flow(
        &self,
        event_name: &str,
        priority: EventPriority,
        source_module: &str,
        target_module: &str,
        duration_ms: Option<f64>,
        success: bool,
        error_message: Option<String>,
        metadata: Option<Value>,
    ) {
        self.pipeline.log_event_flow(
            event_name,
            priority,
            source_module,
            target_module,
            duration_ms,
            success,
            error_message,
            metadata,
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn log_performance(
        &self,
        module: &str,
        operation: &str,
        duration_ms: f64,
        memory_mb: Option<f64>,
        cpu_percent: Option<f64>,
        queue_size: Option<usize>,
        throughput_per_sec: Option<f64>,
    ) {
        self.pipeline.log_performance(
            module,
            operation,
            duration_ms,
            memory_mb,
            cpu_percent,
            queue_size,
            throughput_per_sec,
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn log_connection_state(
        &self,
        connection_id: &str,
        state: ConnectionState,
        host: &str,
        port: u16,
        latency_ms: Option<f64>,
        error_code: Option<i32>,
        error_message: Option<String>,
        retry_count: u32,
    ) {
        self.pipeline.log_connection_state(
            connection_id,
            state,
            host,
            port,
            latency_ms,
            error_code,
            error_message,
            retry_count,
        );
    }

    // ---- mutation surface -------------------------------------------

    /// Empty the record store and subscription tracker, then notify
    /// callbacks so displays refresh to the baseline.
    pub fn clear_records(&self) {
        self.records.clear();
        self.subscriptions.clear();
        self.notify_callbacks();
        info!("all records cleared");
    }

    /// Register an update callback; returns the id needed to unregister
    pub fn register_update_callback(
        &self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> CallbackId {
        let id = CallbackId(self.next_callback_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks.lock().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback; returns whether it was registered
    pub fn unregister_update_callback(&self, id: CallbackId) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(registered, _)| *registered != id);
        callbacks.len() != before
    }

    // Copy the list under the lock, invoke outside it. Each callback is
    // isolated: one panicking callback must not prevent the rest.
    fn notify_callbacks(&self) {
        let callbacks: Vec<(CallbackId, Arc<UpdateCallback>)> =
            self.callbacks.lock().clone();
        for (id, callback) in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                error!("{}", MonitorError::CallbackPanicked { id: id.0 });
            }
        }
    }

    /// Release everything: callbacks, stores, and the pipeline worker.
    ///
    /// The monitor is inert afterwards; further `observe` calls still
    /// succeed against empty stores, and log records are dropped.
    pub fn cleanup(&self) {
        self.callbacks.lock().clear();
        self.records.clear();
        self.subscriptions.clear();
        self.memory.clear();
        self.pipeline.shutdown();
        info!("bus monitor cleaned up");
    }
}

impl Default for BusMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
