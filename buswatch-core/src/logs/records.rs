//! The three structured record shapes
//!
//! Records are immutable once built; producers own creation, the pipeline
//! worker owns everything downstream.

use std::time::SystemTime;

use serde::Serialize;
use serde_json::Value;

use crate::core::EventPriority;

/// One event's trip through the bus, correlated by `correlation_id`
#[derive(Debug, Clone, Serialize)]
pub struct EventFlowRecord {
    pub timestamp: SystemTime,
    pub event_name: String,
    pub priority: EventPriority,
    pub source_module: String,
    pub target_module: String,
    /// Monotonically increasing, assigned by the pipeline
    pub correlation_id: String,
    pub duration_ms: Option<f64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub metadata: Value,
}

/// One timed operation inside a module
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceRecord {
    pub timestamp: SystemTime,
    pub module: String,
    pub operation: String,
    pub duration_ms: f64,
    pub memory_mb: Option<f64>,
    pub cpu_percent: Option<f64>,
    pub queue_size: Option<usize>,
    pub throughput_per_sec: Option<f64>,
}

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

/// One connection's state change
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionRecord {
    pub timestamp: SystemTime,
    pub connection_id: String,
    pub state: ConnectionState,
    pub host: String,
    pub port: u16,
    pub latency_ms: Option<f64>,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
    pub retry_count: u32,
}

/// Queue payload: one record of any kind
#[derive(Debug, Clone, Serialize)]
pub enum LogRecord {
    EventFlow(EventFlowRecord),
    Performance(PerformanceRecord),
    Connection(ConnectionRecord),
}

impl LogRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EventFlow(_) => "event_flow",
            Self::Performance(_) => "performance",
            Self::Connection(_) => "connection_state",
        }
    }
}
