//! Priority ladder and contract identity types
//!
//! `EventPriority` mirrors the bus's dispatch ladder: order-critical events
//! outrank market data, which outranks accounting and housekeeping traffic.
//! `Contract` carries the instrument attributes that subscription events
//! attach to their payloads; missing fields default to empty/zero so
//! fingerprint derivation never fails on malformed data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event priority levels used by the bus for dispatch ordering.
///
/// Lower discriminant = more urgent. `Normal` is the default for emitters
/// that do not specify a priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventPriority {
    /// Buy/sell orders, order cancellations
    Critical = 0,
    /// Order status updates, fills
    High = 1,
    /// Market data updates, price ticks
    Normal = 2,
    /// Account updates, P&L updates
    Low = 3,
    /// Logging, cleanup operations
    Background = 4,
}

impl EventPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Normal => "NORMAL",
            Self::Low => "LOW",
            Self::Background => "BACKGROUND",
        }
    }
}

impl Default for EventPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl std::fmt::Display for EventPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security type of a tracked contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityType {
    Stock,
    Option,
    Future,
    Forex,
    Index,
}

impl SecurityType {
    /// Wire code as it appears in contract payloads
    pub fn code(&self) -> &'static str {
        match self {
            Self::Stock => "STK",
            Self::Option => "OPT",
            Self::Future => "FUT",
            Self::Forex => "CASH",
            Self::Index => "IND",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "STK" => Some(Self::Stock),
            "OPT" => Some(Self::Option),
            "FUT" => Some(Self::Future),
            "CASH" => Some(Self::Forex),
            "IND" => Some(Self::Index),
            _ => None,
        }
    }

    /// Options are keyed by (expiration, strike, right); everything else by
    /// (exchange, currency).
    pub fn is_option(&self) -> bool {
        matches!(self, Self::Option)
    }
}

impl Default for SecurityType {
    fn default() -> Self {
        Self::Stock
    }
}

/// Call/put side of an option contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Call => "C",
            Self::Put => "P",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }
}

/// Instrument identity carried by subscription-lifecycle events.
///
/// Every field tolerates absence: a contract parsed from a payload with
/// missing keys gets empty strings / zero strike / no right, which keeps
/// fingerprint derivation total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub symbol: String,
    pub security_type: SecurityType,
    pub exchange: String,
    pub currency: String,
    /// Option expiration in YYYYMMDD form, empty for non-options
    pub expiration: String,
    /// Option strike, 0.0 for non-options
    pub strike: f64,
    /// Option right, `None` for non-options
    pub right: Option<OptionRight>,
}

impl Contract {
    /// Parse a contract from the `contract` object of an event payload.
    ///
    /// Absent or mistyped fields fall back to defaults; this never fails.
    pub fn from_payload(payload: &Value) -> Self {
        let contract = payload.get("contract").unwrap_or(payload);

        let str_field = |key: &str| {
            contract
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            symbol: str_field("symbol"),
            security_type: contract
                .get("secType")
                .and_then(Value::as_str)
                .and_then(SecurityType::from_code)
                .unwrap_or_default(),
            exchange: str_field("exchange"),
            currency: str_field("currency"),
            expiration: str_field("expiration"),
            strike: contract
                .get("strike")
                .and_then(Value::as_f64)
                .unwrap_or_default(),
            right: contract
                .get("right")
                .and_then(Value::as_str)
                .and_then(OptionRight::from_code),
        }
    }

    pub fn stock(symbol: &str, exchange: &str, currency: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            security_type: SecurityType::Stock,
            exchange: exchange.to_string(),
            currency: currency.to_string(),
            ..Self::default()
        }
    }

    pub fn option(symbol: &str, expiration: &str, strike: f64, right: OptionRight) -> Self {
        Self {
            symbol: symbol.to_string(),
            security_type: SecurityType::Option,
            expiration: expiration.to_string(),
            strike,
            right: Some(right),
            ..Self::default()
        }
    }
}
