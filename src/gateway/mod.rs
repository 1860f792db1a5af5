//! Order gateway: one DLN order per call, with host fallback and retries.
//!
//! A call walks the [`SubmitState`] machine over the configured hosts until
//! the service returns a prepared transaction, then hands it to the
//! [`TxBroadcaster`] and waits for the receipt.

mod broadcast;
mod state_machine;
mod transport;


use std::time::{Duration, Instant};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tracing::{debug, info, warn};

pub use broadcast::{BroadcastReceipt, TxBroadcaster, TxDescriptor};
pub use state_machine::{RetryPolicy, SubmitState};
pub use transport::{
    CreateTxRequest, CreateTxResponse, DlnOrderState, HttpOrderTransport, OrderStatusResponse,
    OrderTransport, PreparedTx,
};

use crate::{
    consts::{BSC_CHAIN_ID, DLN_FALLBACK_HOST, DLN_PRIMARY_HOST, ETH_CHAIN_ID, NATIVE_TOKEN, PAXG_ETH},
    errors::{OrderError, TransportError},
    helpers::{format_amount, short_address},
    logging::targets,
    OrderReceipt,
};

/// Submits one order and waits for the source-chain receipt.
///
/// The seam between the batch scheduler / cycle controller and the network.
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    async fn submit_order(
        &self,
        amount: U256,
        destination: Address,
    ) -> Result<OrderReceipt, OrderError>;
}

/// Fixed request fields shared by every order of a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderParams {
    pub src_chain_id: u64,
    pub dst_chain_id: u64,
    /// Source asset (zero address for the native coin)
    pub src_token: String,
    pub dst_token: String,
    /// Our account: sender and source-chain order authority
    pub sender: Address,
    pub priority_level: String,
}

impl OrderParams {
    /// BNB on BSC → PAXG on Ethereum.
    pub fn bnb_to_paxg(sender: Address) -> Self {
        Self {
            src_chain_id: BSC_CHAIN_ID,
            dst_chain_id: ETH_CHAIN_ID,
            src_token: NATIVE_TOKEN.to_string(),
            dst_token: PAXG_ETH.to_string(),
            sender,
            priority_level: "normal".to_string(),
        }
    }

    /// The recipient is both receiver and destination-chain order authority.
    pub fn request(&self, amount: U256, recipient: Address) -> CreateTxRequest {
        CreateTxRequest {
            src_chain_id: self.src_chain_id.to_string(),
            src_chain_token_in: self.src_token.clone(),
            src_chain_token_in_amount: amount.to_string(),
            dst_chain_id: self.dst_chain_id.to_string(),
            dst_chain_token_out: self.dst_token.clone(),
            dst_chain_token_out_amount: "auto".to_string(),
            dst_chain_token_out_recipient: recipient.to_string(),
            sender_address: self.sender.to_string(),
            src_chain_order_authority_address: self.sender.to_string(),
            dst_chain_order_authority_address: recipient.to_string(),
            src_chain_priority_level: self.priority_level.clone(),
        }
    }
}

/// Outcome of polling an order until it settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCompletion {
    Fulfilled(DlnOrderState),
    Failed(DlnOrderState),
    TimedOut,
}

pub struct OrderGateway<T: OrderTransport, B: TxBroadcaster> {
    transport: T,
    broadcaster: B,
    hosts: Vec<String>,
    policy: RetryPolicy,
    params: OrderParams,
}

impl<T: OrderTransport, B: TxBroadcaster> std::fmt::Debug for OrderGateway<T, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderGateway")
            .field("hosts", &self.hosts)
            .field("policy", &self.policy)
            .field("params", &self.params)
            .finish()
    }
}

impl<T: OrderTransport, B: TxBroadcaster> OrderGateway<T, B> {
    pub fn new(transport: T, broadcaster: B, params: OrderParams) -> Self {
        Self {
            transport,
            broadcaster,
            hosts: vec![DLN_PRIMARY_HOST.to_string(), DLN_FALLBACK_HOST.to_string()],
            policy: RetryPolicy::default(),
            params,
        }
    }

    /// Candidate hosts, primary first.
    pub fn with_hosts(mut self, hosts: Vec<String>) -> Self {
        self.hosts = hosts;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create the order on the first host that accepts it.
    ///
    /// 4xx stops immediately with `Rejected`; transient failures retry with
    /// linear backoff on the same host before falling back.
    pub async fn create_order(
        &self,
        amount: U256,
        destination: Address,
    ) -> Result<CreateTxResponse, OrderError> {
        let request = self.params.request(amount, destination);
        let host_count = self.hosts.len();

        let mut state = self.policy.start(host_count);
        let mut last_error: Option<TransportError> = None;
        let mut response: Option<CreateTxResponse> = None;

        loop {
            match state {
                SubmitState::TryHost { host, attempt } => {
                    debug!(
                        target: targets::GATEWAY,
                        host = %self.hosts[host],
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        "Requesting DLN order"
                    );
                    match self.transport.create_tx(&self.hosts[host], &request).await {
                        Ok(resp) => {
                            response = Some(resp);
                            state = SubmitState::Success;
                        }
                        Err(err) => {
                            warn!(
                                target: targets::GATEWAY,
                                host = %self.hosts[host],
                                attempt,
                                status = ?err.status(),
                                error = %err,
                                "DLN order request failed"
                            );
                            state = self.policy.on_failure(host, attempt, &err, host_count);
                            last_error = Some(err);
                        }
                    }
                }
                SubmitState::Backoff { host, attempt } => {
                    let delay = self.policy.backoff_delay(attempt);
                    debug!(
                        target: targets::GATEWAY,
                        backoff_ms = delay.as_millis() as u64,
                        "Transient DLN error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    state = self.policy.after_backoff(host, attempt);
                }
                SubmitState::Fallback { host } => {
                    info!(
                        target: targets::GATEWAY,
                        host = %self.hosts[host],
                        "Falling back to next DLN host"
                    );
                    state = self.policy.after_fallback(host);
                }
                SubmitState::Success => break,
                SubmitState::Rejected => {
                    let detail = last_error.map(|e| e.to_string()).unwrap_or_default();
                    return Err(OrderError::rejected(format!("DLN API 4xx: {detail}")));
                }
                SubmitState::Exhausted => {
                    let detail = last_error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "no hosts configured".to_string());
                    return Err(OrderError::exhausted(format!("DLN failed: {detail}")));
                }
            }
        }

        response.ok_or_else(|| OrderError::exhausted("DLN failed: empty response"))
    }

    /// Poll the order status until it is fulfilled, fails, or `timeout` elapses.
    ///
    /// Polling errors are logged and do not end the wait.
    pub async fn wait_for_fulfillment(
        &self,
        order_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> OrderCompletion {
        let started = Instant::now();
        while started.elapsed() < timeout {
            if let Some(state) = self.order_state(order_id).await {
                if state.is_fulfilled() {
                    return OrderCompletion::Fulfilled(state);
                }
                if state.is_failed() {
                    return OrderCompletion::Failed(state);
                }
                debug!(target: targets::GATEWAY, order_id, status = ?state, "Order pending");
            }
            tokio::time::sleep(poll_interval).await;
        }
        OrderCompletion::TimedOut
    }

    /// Current order state from the first host that answers.
    pub async fn order_state(&self, order_id: &str) -> Option<DlnOrderState> {
        for host in &self.hosts {
            match self.transport.order_status(host, order_id).await {
                Ok(resp) => return Some(resp.status),
                Err(err) => {
                    warn!(target: targets::GATEWAY, host = %host, order_id, error = %err, "Order status query failed")
                }
            }
        }
        None
    }
}

#[async_trait]
impl<T: OrderTransport, B: TxBroadcaster> OrderSubmitter for OrderGateway<T, B> {
    async fn submit_order(
        &self,
        amount: U256,
        destination: Address,
    ) -> Result<OrderReceipt, OrderError> {
        info!(
            target: targets::GATEWAY,
            recipient = %short_address(&destination.to_string()),
            amount = %format_amount(amount, 18),
            "Creating DLN order"
        );

        let order = self.create_order(amount, destination).await?;
        let order_id = order.order_id.clone();
        let tx = TxDescriptor::from(order.tx);

        info!(
            target: targets::GATEWAY,
            order_id = %order_id,
            to = %tx.to,
            value = %format_amount(tx.value, 18),
            "Sending order transaction"
        );

        let receipt = self
            .broadcaster
            .broadcast(tx)
            .await
            .map_err(|e| OrderError::broadcast(e.to_string(), Some(order_id.clone())))?;

        if !receipt.status {
            return Err(OrderError::broadcast(
                format!("transaction {} reverted", receipt.hash),
                Some(order_id),
            ));
        }

        info!(
            target: targets::GATEWAY,
            order_id = %order_id,
            tx_hash = %receipt.hash,
            "Order transaction confirmed"
        );

        Ok(OrderReceipt {
            transaction_hash: receipt.hash,
            receipt_status: receipt.status,
            order_id,
        })
    }
}
