use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::serde_utils::u256_dec;

/// One recipient's share of the transferable amount.
///
/// `amount` is always at or above the minimum order size of the allocation
/// that produced it.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationEntry {
    pub address: Address,
    /// Source-asset base units (wei)
    #[serde(with = "u256_dec")]
    pub amount: U256,
    pub rank: u32,
    pub percentage: Option<f64>,
}

/// Output of the allocation engine.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub entries: Vec<AllocationEntry>,
    /// Sum of below-minimum shares (or the whole total when nothing could be allocated)
    #[serde(with = "u256_dec")]
    pub unassigned_remainder: U256,
    /// Holders whose share fell below the minimum order size
    pub skipped_count: usize,
    /// Holders with zero or unparsable balance
    pub skipped_zero_weight: usize,
    /// Amount lost to per-holder floor division
    #[serde(with = "u256_dec")]
    pub truncation_loss: U256,
}

impl Allocation {
    /// Nothing allocated: the full total is unassigned.
    pub fn unallocated(total: U256, skipped_zero_weight: usize) -> Self {
        Self {
            entries: Vec::new(),
            unassigned_remainder: total,
            skipped_count: 0,
            skipped_zero_weight,
            truncation_loss: U256::ZERO,
        }
    }

    pub fn allocated_total(&self) -> U256 {
        self.entries
            .iter()
            .fold(U256::ZERO, |acc, e| acc.saturating_add(e.amount))
    }
}
