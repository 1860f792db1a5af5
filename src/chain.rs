//! Source-chain access: balance oracle and transaction broadcaster.

use std::time::Duration;

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{utils::format_ether, Address},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    cycle::BalanceOracle,
    gateway::{BroadcastReceipt, TxBroadcaster, TxDescriptor},
    logging::targets,
    prelude::*,
    Error,
};

/// Wallet-backed JSON-RPC client for the source chain.
///
/// Nonces come from a cached nonce manager, so concurrent broadcasts from
/// one batch get consecutive nonces instead of racing on `eth_getTransactionCount`.
#[derive(Clone)]
pub struct ChainClient {
    provider: DynProvider,
    address: Address,
    receipt_timeout: Option<Duration>,
}

// Security: never print the provider (it owns the signer)
impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("address", &self.address)
            .field("wallet", &"<redacted>")
            .field("receipt_timeout", &self.receipt_timeout)
            .finish()
    }
}

impl ChainClient {
    pub fn new(rpc_url: &str, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| Error::Wallet(format!("invalid private key: {e}")))?;
        let address = signer.address();

        let url = rpc_url
            .parse()
            .map_err(|e| Error::config(format!("invalid RPC url '{rpc_url}': {e}")))?;

        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .with_gas_estimation()
            .with_cached_nonce_management()
            .fetch_chain_id()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self {
            provider,
            address,
            receipt_timeout: None,
        })
    }

    /// Give up waiting for a receipt after `timeout`.
    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = Some(timeout);
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl BalanceOracle for ChainClient {
    async fn get_balance(&self) -> Result<String> {
        let wei = self
            .provider
            .get_balance(self.address)
            .await
            .map_err(|e| Error::Balance(e.to_string()))?;
        let formatted = format_ether(wei);
        debug!(target: targets::CHAIN, address = %self.address, balance = %formatted, "Native balance");
        Ok(formatted)
    }
}

#[async_trait]
impl TxBroadcaster for ChainClient {
    async fn broadcast(&self, tx: TxDescriptor) -> Result<BroadcastReceipt> {
        let request = TransactionRequest::default()
            .with_from(self.address)
            .with_to(tx.to)
            .with_input(tx.data)
            .with_value(tx.value);

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| Error::Rpc(format!("send failed: {e}")))?;
        let hash = *pending.tx_hash();
        info!(target: targets::CHAIN, tx_hash = %hash, "Transaction sent, awaiting receipt");

        let receipt = pending
            .with_timeout(self.receipt_timeout)
            .get_receipt()
            .await
            .map_err(|e| Error::Rpc(format!("receipt for {hash} failed: {e}")))?;

        debug!(target: targets::CHAIN, tx_hash = %hash, status = receipt.status(), "Receipt");
        Ok(BroadcastReceipt {
            hash,
            status: receipt.status(),
        })
    }
}
