use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::{serde_utils::u256_dec, AllocationEntry, OrderError};

/// Successful gateway call: order created, transaction mined.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub transaction_hash: TxHash,
    /// Chain-level receipt status (true = success)
    pub receipt_status: bool,
    pub order_id: String,
}

/// Result of submitting one allocation entry.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderOutcome {
    pub address: Address,
    #[serde(with = "u256_dec")]
    pub amount: U256,
    pub rank: u32,
    pub percentage: Option<f64>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OrderOutcome {
    pub fn succeeded(entry: &AllocationEntry, receipt: OrderReceipt) -> Self {
        Self {
            address: entry.address,
            amount: entry.amount,
            rank: entry.rank,
            percentage: entry.percentage,
            success: true,
            transaction_hash: Some(receipt.transaction_hash),
            order_id: Some(receipt.order_id),
            receipt_status: Some(receipt.receipt_status),
            error: None,
        }
    }

    /// A broadcast failure keeps the remote order id so the divergence stays visible.
    pub fn failed(entry: &AllocationEntry, err: &OrderError) -> Self {
        Self {
            address: entry.address,
            amount: entry.amount,
            rank: entry.rank,
            percentage: entry.percentage,
            success: false,
            transaction_hash: None,
            order_id: err.order_id.clone(),
            receipt_status: None,
            error: Some(err.to_string()),
        }
    }
}
