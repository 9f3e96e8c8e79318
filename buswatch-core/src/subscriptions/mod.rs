//! Subscription lifecycle tracking
//!
//! Long-lived data subscriptions (market data, account, positions, orders,
//! options chains, forex, underlying) announce themselves on the bus as
//! subscribe / unsubscribe / error events. The tracker keys each logical
//! subscription by a deterministic [`Fingerprint`] and follows it through a
//! small state machine:
//!
//! ```text
//!   (start, unknown key)          (start, known key)
//!          │                             │
//!          ▼                             ▼
//!      ┌─────────┐   start/recover  ┌────────┐
//!      │ Pending ├─────────────────►│ Active │◄──────────┐
//!      └─────────┘                  └───┬────┘           │ start
//!                                       │                │
//!                         error ▼       │ end            │
//!                        ┌───────┐      ▼           ┌────┴──────┐
//!                        │ Error ├────────────────► │ Cancelled │
//!                        └───────┘   (end)          └───────────┘
//! ```
//!
//! A repeated start for a known key is implicit recovery: state returns to
//! `Active`, the error count resets, the last error clears. End/error events
//! for keys never started are dropped silently — there is no record to
//! attach them to. `Expired` is reserved and not reachable by any
//! transition.

pub mod fingerprint;
pub mod tracker;

pub use fingerprint::Fingerprint;
pub use tracker::{Subscription, SubscriptionCounts, SubscriptionTracker};

use serde::{Deserialize, Serialize};

/// Coarse category of a tracked data stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionKind {
    MarketData,
    Account,
    Positions,
    Orders,
    OptionsChain,
    Forex,
    Underlying,
}

impl SubscriptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketData => "market_data",
            Self::Account => "account_data",
            Self::Positions => "positions",
            Self::Orders => "orders",
            Self::OptionsChain => "options_chain",
            Self::Forex => "forex",
            Self::Underlying => "underlying",
        }
    }
}

/// Lifecycle state of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionState {
    /// Created from a first start event, no recovery observed yet
    Pending,
    /// Start observed again for a known key
    Active,
    /// Most recent lifecycle event was an error
    Error,
    /// Unsubscribed
    Cancelled,
    /// Reserved; no transition produces this state
    Expired,
}

impl SubscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

/// What a lifecycle-pattern event means for the matched subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    End,
    Error,
}

/// Match an event name against the fixed lifecycle pattern table.
///
/// These names are the bus's documented subscription-lifecycle vocabulary;
/// anything else is ordinary traffic the tracker ignores.
///
/// | event name              | kind          | action |
/// |-------------------------|---------------|--------|
/// | `market_data.subscribe` | market data   | start  |
/// | `market_data.unsubscribe` | market data | end    |
/// | `market_data.error`     | market data   | error  |
/// | `account.request_summary` | account     | start  |
/// | `get_positions`         | positions     | start  |
/// | `get_open_orders`       | orders        | start  |
/// | `options.request_chain` | options chain | start  |
/// | `options.chain_error`   | options chain | error  |
/// | `forex.subscribe`       | forex         | start  |
/// | `forex.unsubscribe`     | forex         | end    |
/// | `forex.error`           | forex         | error  |
/// | `underlying.subscribe`  | underlying    | start  |
/// | `underlying.unsubscribe`| underlying    | end    |
/// | `underlying.error`      | underlying    | error  |
pub fn classify(event_name: &str) -> Option<(SubscriptionKind, LifecycleAction)> {
    use LifecycleAction::*;
    use SubscriptionKind::*;

    let entry = match event_name {
        "market_data.subscribe" => (MarketData, Start),
        "market_data.unsubscribe" => (MarketData, End),
        "market_data.error" => (MarketData, Error),
        "account.request_summary" => (Account, Start),
        "get_positions" => (Positions, Start),
        "get_open_orders" => (Orders, Start),
        "options.request_chain" => (OptionsChain, Start),
        "options.chain_error" => (OptionsChain, Error),
        "forex.subscribe" => (Forex, Start),
        "forex.unsubscribe" => (Forex, End),
        "forex.error" => (Forex, Error),
        "underlying.subscribe" => (Underlying, Start),
        "underlying.unsubscribe" => (Underlying, End),
        "underlying.error" => (Underlying, Error),
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_table_covers_market_data_lifecycle() {
        assert_eq!(
            classify("market_data.subscribe"),
            Some((SubscriptionKind::MarketData, LifecycleAction::Start))
        );
        assert_eq!(
            classify("market_data.unsubscribe"),
            Some((SubscriptionKind::MarketData, LifecycleAction::End))
        );
        assert_eq!(
            classify("market_data.error"),
            Some((SubscriptionKind::MarketData, LifecycleAction::Error))
        );
    }

    #[test]
    fn test_ordinary_traffic_does_not_classify() {
        assert_eq!(classify("market_data.tick"), None);
        assert_eq!(classify("order.fill"), None);
        assert_eq!(classify(""), None);
    }
}
