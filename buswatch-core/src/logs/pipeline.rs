//! Bounded queue, background worker, and read-side summaries

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::{EventPriority, MonitorError};
use crate::logs::records::{
    ConnectionRecord, ConnectionState, EventFlowRecord, LogRecord, PerformanceRecord,
};

/// Queue and history capacities plus the worker poll cadence
#[derive(Debug, Clone)]
pub struct LogPipelineConfig {
    /// Producer/consumer queue capacity
    pub queue_capacity: usize,
    pub event_flow_capacity: usize,
    pub performance_capacity: usize,
    pub connection_capacity: usize,
    /// Worker blocking-poll timeout; bounds shutdown latency
    pub poll_timeout: Duration,
}

impl Default for LogPipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            event_flow_capacity: 10_000,
            performance_capacity: 5_000,
            connection_capacity: 1_000,
            poll_timeout: Duration::from_millis(100),
        }
    }
}

/// Running per-module performance aggregate, owned by the worker
#[derive(Debug, Clone, Serialize)]
pub struct ModuleStats {
    pub operations: u64,
    pub total_ms: f64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub last_operation: Option<SystemTime>,
}

impl ModuleStats {
    fn update(&mut self, record: &PerformanceRecord) {
        self.operations += 1;
        self.total_ms += record.duration_ms;
        self.avg_ms = self.total_ms / self.operations as f64;
        self.min_ms = self.min_ms.min(record.duration_ms);
        self.max_ms = self.max_ms.max(record.duration_ms);
        self.last_operation = Some(record.timestamp);
    }

    fn new(record: &PerformanceRecord) -> Self {
        Self {
            operations: 1,
            total_ms: record.duration_ms,
            avg_ms: record.duration_ms,
            min_ms: record.duration_ms,
            max_ms: record.duration_ms,
            last_operation: Some(record.timestamp),
        }
    }
}

/// Event-flow reduction over a trailing window
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventFlowSummary {
    pub total_events: usize,
    pub successful_events: usize,
    pub failed_events: usize,
    pub avg_duration_ms: f64,
    pub by_priority: HashMap<String, u64>,
    pub by_module: HashMap<String, u64>,
    pub window_minutes: u64,
}

/// Connection-state reduction
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionSummary {
    /// Latest known state per connection id
    pub current_states: HashMap<String, String>,
    pub total_records: usize,
    /// Records inside the trailing hour
    pub recent_connections: usize,
}

/// Pipeline health counters
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PipelineStats {
    pub queued: usize,
    pub dropped: u64,
    pub event_flow_records: usize,
    pub performance_records: usize,
    pub connection_records: usize,
}

#[derive(Default)]
struct Histories {
    event_flow: Mutex<VecDeque<EventFlowRecord>>,
    performance: Mutex<VecDeque<PerformanceRecord>>,
    connection: Mutex<VecDeque<ConnectionRecord>>,
    module_stats: Mutex<HashMap<String, ModuleStats>>,
    connection_states: Mutex<HashMap<String, ConnectionState>>,
}

/// Producer/consumer pipeline for structured log records.
///
/// Producers call the `log_*` methods from any thread; enqueue is
/// non-blocking and drops with a warning when the queue is full. The
/// single worker thread owns all downstream state.
pub struct LogPipeline {
    config: LogPipelineConfig,
    sender: Sender<LogRecord>,
    shutdown: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    histories: Arc<Histories>,
    dropped: AtomicU64,
    correlation: AtomicU64,
}

impl LogPipeline {
    pub fn new(config: LogPipelineConfig) -> Self {
        let (pipeline, receiver) = Self::build(config);
        pipeline.spawn_worker(receiver);
        pipeline
    }

    fn build(config: LogPipelineConfig) -> (Self, Receiver<LogRecord>) {
        let (sender, receiver) = bounded(config.queue_capacity);
        let pipeline = Self {
            config,
            sender,
            shutdown: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
            histories: Arc::new(Histories::default()),
            dropped: AtomicU64::new(0),
            correlation: AtomicU64::new(0),
        };
        (pipeline, receiver)
    }

    fn spawn_worker(&self, receiver: Receiver<LogRecord>) {
        let shutdown = Arc::clone(&self.shutdown);
        let histories = Arc::clone(&self.histories);
        let config = self.config.clone();

        let handle = std::thread::Builder::new()
            .name("buswatch-log-worker".to_string())
            .spawn(move || {
                while !shutdown.load(Ordering::Acquire) {
                    match receiver.recv_timeout(config.poll_timeout) {
                        // A dequeued record is always processed fully before
                        // the shutdown flag is looked at again
                        Ok(record) => consume(record, &histories, &config),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .expect("failed to spawn log worker thread");

        *self.worker.lock() = Some(handle);
    }

    /// Log one event's trip from `source_module` to `target_module`.
    ///
    /// Assigns the next correlation id and enqueues; never blocks.
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
        let record = EventFlowRecord {
            timestamp: SystemTime::now(),
            event_name: event_name.to_string(),
            priority,
            source_module: source_module.to_string(),
            target_module: target_module.to_string(),
            correlation_id: self.next_correlation_id(),
            duration_ms,
            success,
            error_message,
            metadata: metadata.unwrap_or(Value::Null),
        };
        self.enqueue(LogRecord::EventFlow(record));
    }

    /// Log one timed operation; never blocks
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
        let record = PerformanceRecord {
            timestamp: SystemTime::now(),
            module: module.to_string(),
            operation: operation.to_string(),
            duration_ms,
            memory_mb,
            cpu_percent,
            queue_size,
            throughput_per_sec,
        };
        self.enqueue(LogRecord::Performance(record));
    }

    /// Log one connection state change; never blocks
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
        let record = ConnectionRecord {
            timestamp: SystemTime::now(),
            connection_id: connection_id.to_string(),
            state,
            host: host.to_string(),
            port,
            latency_ms,
            error_code,
            error_message,
            retry_count,
        };
        self.enqueue(LogRecord::Connection(record));
    }

    // Correlation ids order event-flow records across producer threads
    fn next_correlation_id(&self) -> String {
        let n = self.correlation.fetch_add(1, Ordering::Relaxed) + 1;
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        format!("evt_{n}_{secs}")
    }

    fn enqueue(&self, record: LogRecord) {
        let kind = record.kind();
        let error = match self.sender.try_send(record) {
            Ok(()) => return,
            Err(TrySendError::Full(_)) => MonitorError::QueueFull {
                kind,
                capacity: self.config.queue_capacity,
            },
            Err(TrySendError::Disconnected(_)) => MonitorError::PipelineShutDown { kind },
        };
        self.dropped.fetch_add(1, Ordering::Relaxed);
        warn!("{error}");
    }

    /// Event-flow reduction over the trailing `window_minutes`
    pub fn event_flow_summary(&self, window_minutes: u64) -> EventFlowSummary {
        let cutoff = SystemTime::now() - Duration::from_secs(window_minutes * 60);
        let history = self.histories.event_flow.lock();

        let mut summary = EventFlowSummary {
            window_minutes,
            ..EventFlowSummary::default()
        };
        let mut durations_total = 0.0;
        let mut durations_seen = 0usize;

        for record in history.iter().filter(|r| r.timestamp >= cutoff) {
            summary.total_events += 1;
            if record.success {
                summary.successful_events += 1;
            } else {
                summary.failed_events += 1;
            }
            if let Some(duration) = record.duration_ms {
                durations_total += duration;
                durations_seen += 1;
            }
            *summary
                .by_priority
                .entry(record.priority.as_str().to_string())
                .or_insert(0) += 1;
            *summary
                .by_module
                .entry(record.target_module.clone())
                .or_insert(0) += 1;
        }

        if durations_seen > 0 {
            summary.avg_duration_ms = durations_total / durations_seen as f64;
        }
        summary
    }

    /// Per-module aggregates; filtered to one module when given
    pub fn performance_summary(&self, module: Option<&str>) -> HashMap<String, ModuleStats> {
        let stats = self.histories.module_stats.lock();
        match module {
            Some(name) => stats
                .get(name)
                .map(|s| HashMap::from([(name.to_string(), s.clone())]))
                .unwrap_or_default(),
            None => stats.clone(),
        }
    }

    /// Current connection states plus recent-record counters
    pub fn connection_summary(&self) -> ConnectionSummary {
        let history = self.histories.connection.lock();
        let states = self.histories.connection_states.lock();
        let hour_ago = SystemTime::now() - Duration::from_secs(3600);

        ConnectionSummary {
            current_states: states
                .iter()
                .map(|(id, state)| (id.clone(), state.as_str().to_string()))
                .collect(),
            total_records: history.len(),
            recent_connections: history.iter().filter(|r| r.timestamp >= hour_ago).count(),
        }
    }

    /// Queue depth, drop count, and history sizes
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            queued: self.sender.len(),
            dropped: self.dropped.load(Ordering::Relaxed),
            event_flow_records: self.histories.event_flow.lock().len(),
            performance_records: self.histories.performance.lock().len(),
            connection_records: self.histories.connection.lock().len(),
        }
    }

    /// Records dropped on enqueue so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop the worker.
    ///
    /// The worker notices the flag within one poll timeout; any record it
    /// already dequeued is processed first. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!("log worker terminated abnormally");
            }
        }
    }
}

impl Drop for LogPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// Worker-side fan-out: push into the kind's bounded history and refresh
// the derived aggregates. Runs only on the worker thread.
fn consume(record: LogRecord, histories: &Histories, config: &LogPipelineConfig) {
    match record {
        LogRecord::EventFlow(record) => {
            emit_structured("event_flow", &record);
            let mut history = histories.event_flow.lock();
            if history.len() == config.event_flow_capacity {
                history.pop_front();
            }
            history.push_back(record);
        }
        LogRecord::Performance(record) => {
            emit_structured("performance", &record);
            {
                let mut stats = histories.module_stats.lock();
                stats
                    .entry(record.module.clone())
                    .and_modify(|s| s.update(&record))
                    .or_insert_with(|| ModuleStats::new(&record));
            }
            let mut history = histories.performance.lock();
            if history.len() == config.performance_capacity {
                history.pop_front();
            }
            history.push_back(record);
        }
        LogRecord::Connection(record) => {
            emit_structured("connection_state", &record);
            histories
                .connection_states
                .lock()
                .insert(record.connection_id.clone(), record.state);
            let mut history = histories.connection.lock();
            if history.len() == config.connection_capacity {
                history.pop_front();
            }
            history.push_back(record);
        }
    }
}

// One JSON line per record for downstream file handlers to pick up
fn emit_structured<T: Serialize>(kind: &str, record: &T) {
    match serde_json::to_string(record) {
        Ok(json) => debug!(target: "buswatch::logs", kind, "{json}"),
        Err(e) => warn!("failed to serialize {kind} record: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if check() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        check()
    }

    #[test]
    fn test_event_flow_records_reach_history() {
        let pipeline = LogPipeline::new(LogPipelineConfig::default());
        pipeline.log_event_flow(
            "market_data.tick",
            EventPriority::Normal,
            "feed",
            "engine",
            Some(0.4),
            true,
            None,
            None,
        );

        assert!(wait_until(Duration::from_secs(2), || {
            pipeline.stats().event_flow_records == 1
        }));

        let summary = pipeline.event_flow_summary(5);
        assert_eq!(summary.total_events, 1);
        assert_eq!(summary.successful_events, 1);
        assert_eq!(summary.by_module.get("engine"), Some(&1));
        pipeline.shutdown();
    }

    #[test]
    fn test_correlation_ids_are_monotonic() {
        let pipeline = LogPipeline::new(LogPipelineConfig::default());
        let a = pipeline.next_correlation_id();
        let b = pipeline.next_correlation_id();
        assert!(a.starts_with("evt_1_"));
        assert!(b.starts_with("evt_2_"));
        pipeline.shutdown();
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        // Keep the receiver alive but never drain it, so the queue can
        // actually fill
        let (pipeline, _receiver) = LogPipeline::build(LogPipelineConfig {
            queue_capacity: 2,
            ..LogPipelineConfig::default()
        });

        let start = Instant::now();
        for _ in 0..100 {
            pipeline.log_performance("risk", "validate", 0.05, None, None, None, None);
        }
        assert!(
            start.elapsed() < Duration::from_secs(1),
            "enqueue must never block the producer"
        );
        assert_eq!(pipeline.dropped(), 98);
    }

    #[test]
    fn test_performance_aggregates() {
        let pipeline = LogPipeline::new(LogPipelineConfig::default());
        for duration in [2.0, 4.0, 6.0] {
            pipeline.log_performance("engine", "on_tick", duration, None, None, None, None);
        }

        assert!(wait_until(Duration::from_secs(2), || {
            pipeline.stats().performance_records == 3
        }));

        let stats = pipeline.performance_summary(Some("engine"));
        let engine = stats.get("engine").unwrap();
        assert_eq!(engine.operations, 3);
        assert_eq!(engine.min_ms, 2.0);
        assert_eq!(engine.max_ms, 6.0);
        assert!((engine.avg_ms - 4.0).abs() < 1e-9);

        assert!(pipeline.performance_summary(Some("missing")).is_empty());
        pipeline.shutdown();
    }

    #[test]
    fn test_connection_state_map_tracks_latest() {
        let pipeline = LogPipeline::new(LogPipelineConfig::default());
        pipeline.log_connection_state(
            "gw-1",
            ConnectionState::Connecting,
            "127.0.0.1",
            4001,
            None,
            None,
            None,
            0,
        );
        pipeline.log_connection_state(
            "gw-1",
            ConnectionState::Connected,
            "127.0.0.1",
            4001,
            Some(1.2),
            None,
            None,
            0,
        );

        assert!(wait_until(Duration::from_secs(2), || {
            pipeline.stats().connection_records == 2
        }));

        let summary = pipeline.connection_summary();
        assert_eq!(summary.current_states.get("gw-1").map(String::as_str), Some("connected"));
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.recent_connections, 2);
        pipeline.shutdown();
    }

    #[test]
    fn test_shutdown_is_responsive_and_idempotent() {
        let pipeline = LogPipeline::new(LogPipelineConfig::default());
        let start = Instant::now();
        pipeline.shutdown();
        assert!(start.elapsed() < Duration::from_secs(2));
        // Second call is a no-op
        pipeline.shutdown();

        // Records after shutdown are dropped, not panicking
        pipeline.log_performance("engine", "on_tick", 1.0, None, None, None, None);
    }

    #[test]
    fn test_histories_are_bounded() {
        let pipeline = LogPipeline::new(LogPipelineConfig {
            performance_capacity: 5,
            ..LogPipelineConfig::default()
        });
        for i in 0..20 {
            pipeline.log_performance("engine", "op", i as f64, None, None, None, None);
        }

        assert!(wait_until(Duration::from_secs(2), || {
            pipeline.stats().queued == 0
        }));
        assert!(pipeline.stats().performance_records <= 5);
        pipeline.shutdown();
    }
}
