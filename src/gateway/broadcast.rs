use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;

use crate::{gateway::transport::PreparedTx, prelude::*};

/// Transaction to sign and send on the source chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxDescriptor {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl From<PreparedTx> for TxDescriptor {
    fn from(tx: PreparedTx) -> Self {
        Self {
            to: tx.to,
            data: tx.data,
            value: tx.value.unwrap_or(U256::ZERO),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReceipt {
    pub hash: TxHash,
    /// Receipt status: true when the transaction executed successfully
    pub status: bool,
}

/// Signs, sends and awaits the receipt of a transaction.
///
/// Implementations must serialize nonce assignment: the scheduler issues
/// several broadcasts concurrently within a batch.
#[async_trait]
pub trait TxBroadcaster: Send + Sync {
    async fn broadcast(&self, tx: TxDescriptor) -> Result<BroadcastReceipt>;
}
