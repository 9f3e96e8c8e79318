//! Error taxonomy for monitor operations
//!
//! Observation is non-fatal by design: every variant here degrades to
//! "monitoring data is incomplete", never to "application stops". Callers
//! on the emit path log these and continue.

use thiserror::Error;

/// Errors surfaced by monitor subsystems
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// The structured-log queue was full and the record was dropped
    #[error("log queue full ({capacity} records), {kind} record dropped")]
    QueueFull {
        /// Record kind that was dropped
        kind: &'static str,
        /// Configured queue capacity
        capacity: usize,
    },

    /// The log worker is gone (pipeline already shut down)
    #[error("log pipeline is shut down, {kind} record dropped")]
    PipelineShutDown { kind: &'static str },

    /// A registered update callback panicked and was isolated
    #[error("update callback {id} panicked")]
    CallbackPanicked {
        /// Registration id of the offending callback
        id: u64,
    },
}
