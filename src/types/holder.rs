//! Holder snapshot types.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{consts::WEIGHT_DECIMALS, helpers::parse_amount};

/// One ranked token holder, as returned by a holder source.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HolderRecord {
    pub address: Address,
    /// Token balance in human units ("5000.25")
    pub balance: String,
    /// 1-based position in the descending balance ranking
    pub rank: u32,
    /// Share of total supply reported by the source, if any
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl HolderRecord {
    pub fn new(address: Address, balance: impl Into<String>, rank: u32) -> Self {
        Self {
            address,
            balance: balance.into(),
            rank,
            percentage: None,
            label: None,
        }
    }

    /// Balance as an 18-decimal fixed-point weight.
    ///
    /// Returns `None` when the balance string is not a non-negative decimal.
    pub fn weight(&self) -> Option<U256> {
        parse_amount(&self.balance, WEIGHT_DECIMALS).ok()
    }
}
