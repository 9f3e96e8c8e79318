//! Shared types for bus observation
//!
//! This module provides the vocabulary the rest of the crate speaks:
//! - `EventPriority`: the bus's five-level priority ladder
//! - `Contract` / `SecurityType` / `OptionRight`: the instrument identity
//!   attached to subscription-lifecycle events
//! - `MonitorError`: the error taxonomy for the few fallible paths

pub mod errors;
pub mod types;

pub use errors::MonitorError;
pub use types::{Contract, EventPriority, OptionRight, SecurityType};
