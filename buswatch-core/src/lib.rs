//! Buswatch Core - Event-Bus Observability for Trading Applications
//!
//! Buswatch sits between a trading application and its in-process event bus.
//! It observes every emitted event, keeps bounded per-event statistics and
//! history, follows the lifecycle of long-lived data subscriptions, watches
//! process memory for leak-shaped growth, and feeds a structured log pipeline.
//! It never owns dispatch: the wrapped bus delivers events exactly as before.
//!
//! ## Architecture
//! - **Observe, never block**: recording happens synchronously before
//!   delegation, and any recording failure is logged and swallowed
//! - **Bounded everywhere**: every store is capacity-limited (ring buffers,
//!   evicting maps, bounded queues) so the monitor cannot leak
//! - **One coarse lock per store**, held only for in-memory mutation or a
//!   snapshot copy, never across callbacks or I/O
//! - **Single consumer** drains the structured-log queue on a background
//!   thread with a short poll timeout for responsive shutdown
//!
//! ## Core Modules
//! - `core`: shared types (priorities, contracts) and error taxonomy
//! - `bus`: the `EventBus` seam, a local dispatcher, and the monitoring
//!   decorator
//! - `records`: bounded per-event-type record store with history ring
//! - `subscriptions`: fingerprint-keyed subscription lifecycle tracker
//! - `memory`: memory sampling, rolling window, and leak warnings
//! - `logs`: structured log records, bounded queue, background worker
//! - `monitor`: the `BusMonitor` facade tying the stores together

pub mod bus;
pub mod core;
pub mod logs;
pub mod memory;
pub mod monitor;
pub mod records;
pub mod subscriptions;
pub mod utils;

// Re-export the types most integrations need
pub use crate::bus::{EventBus, LocalBus, MonitoredBus};
pub use crate::core::{Contract, EventPriority, MonitorError, OptionRight, SecurityType};
pub use crate::monitor::{BusMonitor, CallbackId, MonitorConfig, MonitorReport, Trend};
pub use crate::records::{EventRecord, EventStatistics, HistoryEntry};
pub use crate::subscriptions::{Fingerprint, Subscription, SubscriptionKind, SubscriptionState};

// Re-export error types
pub use anyhow::{Error, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bus::{EventBus, LocalBus, MonitoredBus};
    pub use crate::core::{Contract, EventPriority};
    pub use crate::monitor::{BusMonitor, MonitorConfig};
    pub use crate::subscriptions::{SubscriptionKind, SubscriptionState};
    pub use crate::{Error, Result};
}
