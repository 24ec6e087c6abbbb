//! Cost Ledger: running estimate of backend spend for one session.
//!
//! Totals only ever grow. The ledger knows nothing about stages; whoever completes a
//! billable call tracks it exactly once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::Usage;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("Cost amount for '{provider}' must be a non-negative finite number, got {amount}")]
    InvalidAmount { provider: String, amount: f64 },
}

/// Immutable copy of the ledger's totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSnapshot {
    pub by_provider: BTreeMap<String, f64>,
    pub total: f64,
}

impl CostSnapshot {
    pub fn provider(&self, name: &str) -> f64 {
        self.by_provider.get(name).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CostLedger {
    totals: BTreeMap<String, f64>,
    total: f64,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to the provider's running total and to the grand total.
    pub fn track(&mut self, provider: &str, amount: f64) -> Result<(), LedgerError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(LedgerError::InvalidAmount {
                provider: provider.to_string(),
                amount,
            });
        }

        *self.totals.entry(provider.to_string()).or_insert(0.0) += amount;
        self.total += amount;
        Ok(())
    }

    pub fn snapshot(&self) -> CostSnapshot {
        CostSnapshot {
            by_provider: self.totals.clone(),
            total: self.total,
        }
    }
}

/// Per-million-token prices used to estimate the cost of one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

impl Pricing {
    pub fn estimate(&self, usage: Usage) -> f64 {
        (usage.input_tokens as f64 * self.input_per_mtok
            + usage.output_tokens as f64 * self.output_per_mtok)
            / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_running_total_per_provider() {
        let mut ledger = CostLedger::new();
        ledger.track("X", 0.06).unwrap();
        ledger.track("X", 0.03).unwrap();

        let snapshot = ledger.snapshot();
        assert!((snapshot.provider("X") - 0.09).abs() < 1e-12);
        assert!((snapshot.total - 0.09).abs() < 1e-12);
    }

    #[test]
    fn test_grand_total_is_sum_across_providers() {
        let mut ledger = CostLedger::new();
        ledger.track("anthropic", 0.12).unwrap();
        ledger.track("whisper", 0.01).unwrap();
        ledger.track("anthropic", 0.02).unwrap();

        let snapshot = ledger.snapshot();
        let sum: f64 = snapshot.by_provider.values().sum();
        assert!((snapshot.total - sum).abs() < 1e-12);
        assert_eq!(snapshot.by_provider.len(), 2);
    }

    #[test]
    fn test_rejects_negative_and_non_finite_amounts() {
        let mut ledger = CostLedger::new();
        ledger.track("X", 0.5).unwrap();

        assert!(ledger.track("X", -0.1).is_err());
        assert!(ledger.track("X", f64::NAN).is_err());
        assert!(ledger.track("X", f64::INFINITY).is_err());

        assert!((ledger.snapshot().provider("X") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut ledger = CostLedger::new();
        ledger.track("X", 1.0).unwrap();
        let before = ledger.snapshot();
        ledger.track("X", 1.0).unwrap();

        assert!((before.total - 1.0).abs() < 1e-12);
        assert!((ledger.snapshot().total - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_amount_registers_provider() {
        let mut ledger = CostLedger::new();
        ledger.track("free", 0.0).unwrap();
        assert_eq!(ledger.snapshot().by_provider.get("free"), Some(&0.0));
    }

    #[test]
    fn test_pricing_estimate() {
        let pricing = Pricing {
            input_per_mtok: 3.0,
            output_per_mtok: 15.0,
        };
        let cost = pricing.estimate(Usage {
            input_tokens: 2_000,
            output_tokens: 4_000,
        });
        // 2000 * 3 / 1e6 + 4000 * 15 / 1e6
        assert!((cost - 0.066).abs() < 1e-12);
    }
}
