use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    serde_utils::{u256_dec, u256_dec_opt},
    OrderOutcome,
};

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    SkippedLowBalance,
    Completed,
}

impl std::fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleStatus::SkippedLowBalance => write!(f, "skipped_low_balance"),
            CycleStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Auditable summary of one cycle, handed to the caller for reporting.
///
/// Base-unit fields serialize as decimal strings.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleResult {
    pub status: CycleStatus,
    pub timestamp: DateTime<Utc>,
    /// Balance as reported by the oracle (human units)
    pub total_balance: String,
    /// Transferable share of the balance that went into allocation
    #[serde(default, with = "u256_dec_opt")]
    pub amount_to_bridge: Option<U256>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_low_min: usize,
    pub skipped_zero_weight: usize,
    /// Sum of succeeded amounts only
    #[serde(with = "u256_dec")]
    pub total_amount_used: U256,
    #[serde(with = "u256_dec")]
    pub unassigned_remainder: U256,
    #[serde(with = "u256_dec")]
    pub truncation_loss: U256,
    pub outcomes: Vec<OrderOutcome>,
}

impl CycleResult {
    pub fn skipped_low_balance(total_balance: impl Into<String>) -> Self {
        Self {
            status: CycleStatus::SkippedLowBalance,
            timestamp: Utc::now(),
            total_balance: total_balance.into(),
            amount_to_bridge: None,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped_low_min: 0,
            skipped_zero_weight: 0,
            total_amount_used: U256::ZERO,
            unassigned_remainder: U256::ZERO,
            truncation_loss: U256::ZERO,
            outcomes: Vec::new(),
        }
    }

    /// One-line status for health/status endpoints.
    pub fn summary(&self) -> String {
        match self.status {
            CycleStatus::SkippedLowBalance => {
                format!("Skipped: balance {} below minimum", self.total_balance)
            }
            CycleStatus::Completed => {
                format!("Completed: {}/{} orders succeeded", self.succeeded, self.attempted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_result_json_shape() {
        let result = CycleResult::skipped_low_balance("0.5");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "skipped_low_balance");
        assert_eq!(json["totalBalance"], "0.5");
        assert_eq!(json["totalAmountUsed"], "0");
        assert!(json["amountToBridge"].is_null());
        assert_eq!(result.summary(), "Skipped: balance 0.5 below minimum");
    }
}
