//! Structured log pipeline
//!
//! Producers (emit callers, connection managers, timers) build immutable
//! records and hand them to a bounded queue; a single background worker
//! drains the queue and fans out by record kind into three bounded
//! histories, updating derived aggregates as it goes. Producers never
//! block: a full queue drops the record with a logged warning.
//!
//! Record kinds:
//! - event-flow: one event's trip from source to target module
//! - performance: one timed operation inside a module
//! - connection-state: one connection's state change

pub mod pipeline;
pub mod records;

pub use pipeline::{
    ConnectionSummary, EventFlowSummary, LogPipeline, LogPipelineConfig, ModuleStats,
    PipelineStats,
};
pub use records::{
    ConnectionRecord, ConnectionState, EventFlowRecord, LogRecord, PerformanceRecord,
};
