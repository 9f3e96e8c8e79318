//! Deterministic subscription fingerprints
//!
//! A fingerprint identifies one logical subscription regardless of how the
//! subscribe call spelled its optional contract fields. Two subscribe calls
//! for the same contract must always collide to the same key, so derivation
//! is pure over (kind, contract) and tolerates absent fields.
//!
//! Key shape:
//! - options: `kind_symbol_OPT_expiration_strike_right`
//! - everything else: `kind_symbol_secType_exchange_currency`

use serde::Serialize;

use crate::core::Contract;
use crate::subscriptions::SubscriptionKind;

/// Deterministic identity of one logical subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint for `kind` over `contract`.
    ///
    /// Never fails: missing fields contribute their defaults, so malformed
    /// subscription payloads still map to a stable key.
    pub fn derive(kind: SubscriptionKind, contract: &Contract) -> Self {
        let key = if contract.security_type.is_option() {
            format!(
                "{}_{}_{}_{}_{}_{}",
                kind.as_str(),
                contract.symbol,
                contract.security_type.code(),
                contract.expiration,
                format_strike(contract.strike),
                contract.right.map(|r| r.code()).unwrap_or(""),
            )
        } else {
            format!(
                "{}_{}_{}_{}_{}",
                kind.as_str(),
                contract.symbol,
                contract.security_type.code(),
                contract.exchange,
                contract.currency,
            )
        };
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Strike keys must not depend on float formatting quirks: render with a
// fixed two-decimal precision so 500, 500.0 and 500.00 collide.
fn format_strike(strike: f64) -> String {
    format!("{strike:.2}")
}
