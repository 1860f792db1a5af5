//! Cycle controller: balance → holders → allocation → batches → result.
//!
//! One call to [`CycleController::run_cycle`] is one cycle. The controller
//! keeps no state between calls and is not reentrant: the caller must make
//! sure only one cycle runs at a time.


use alloy::primitives::U256;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    allocation::allocate,
    consts::NATIVE_DECIMALS,
    gateway::OrderSubmitter,
    helpers::{apply_bps, format_amount, parse_amount},
    logging::targets,
    prelude::*,
    scheduler::{run_batches, BatchConfig},
    CycleResult, CycleStatus, Error, HolderRecord,
};

/// Available native balance of the operating account, in human units.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    async fn get_balance(&self) -> Result<String>;
}

/// Ranked, pre-filtered recipients, descending by balance.
#[async_trait]
pub trait HolderSource: Send + Sync {
    async fn get_holders(&self) -> Result<Vec<HolderRecord>>;
}

/// Thresholds and pacing for one cycle. Amounts are native base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleConfig {
    /// Below this balance the cycle is skipped
    pub min_total: U256,
    /// Smallest order worth submitting
    pub min_per_order: U256,
    /// Share of the balance that is bridged; the rest stays as a gas buffer
    pub transferable_bps: u16,
    pub batch: BatchConfig,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_total: U256::from(1_000_000_000_000_000_000u64),
            min_per_order: U256::from(6_000_000_000_000_000u64),
            transferable_bps: 9500,
            batch: BatchConfig::default(),
        }
    }
}

pub struct CycleController<O, H, S>
where
    O: BalanceOracle,
    H: HolderSource,
    S: OrderSubmitter,
{
    oracle: O,
    holders: H,
    submitter: S,
    config: CycleConfig,
}

impl<O, H, S> CycleController<O, H, S>
where
    O: BalanceOracle,
    H: HolderSource,
    S: OrderSubmitter,
{
    pub fn new(oracle: O, holders: H, submitter: S, config: CycleConfig) -> Self {
        Self {
            oracle,
            holders,
            submitter,
            config,
        }
    }

    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    /// Run one cycle.
    ///
    /// Balance and holder failures are returned as-is; per-recipient order
    /// failures are recorded in the result, which is still `completed`.
    pub async fn run_cycle(&self) -> Result<CycleResult> {
        info!(target: targets::CYCLE, "Starting distribution cycle");

        let balance_str = self.oracle.get_balance().await?;
        let balance = parse_amount(&balance_str, NATIVE_DECIMALS)
            .map_err(|_| Error::Balance(format!("unparsable balance '{balance_str}'")))?;

        info!(
            target: targets::CYCLE,
            balance = %balance_str,
            min_total = %format_amount(self.config.min_total, NATIVE_DECIMALS),
            "Native balance"
        );

        if balance < self.config.min_total {
            info!(target: targets::CYCLE, "Balance below minimum, skipping cycle");
            return Ok(CycleResult::skipped_low_balance(balance_str));
        }

        let amount_to_bridge = apply_bps(balance, self.config.transferable_bps);
        info!(
            target: targets::CYCLE,
            amount = %format_amount(amount_to_bridge, NATIVE_DECIMALS),
            bps = self.config.transferable_bps,
            "Amount to bridge"
        );

        let holders = self.holders.get_holders().await?;
        info!(target: targets::CYCLE, holders = holders.len(), "Fetched holders");

        let allocation = allocate(amount_to_bridge, &holders, self.config.min_per_order);
        info!(
            target: targets::CYCLE,
            allocations = allocation.entries.len(),
            skipped_low_min = allocation.skipped_count,
            skipped_zero_weight = allocation.skipped_zero_weight,
            unassigned = %format_amount(allocation.unassigned_remainder, NATIVE_DECIMALS),
            "Allocation computed"
        );

        let outcomes = run_batches(&allocation.entries, self.config.batch, |entry| {
            self.submitter.submit_order(entry.amount, entry.address)
        })
        .await;

        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - succeeded;
        let total_amount_used = outcomes
            .iter()
            .filter(|o| o.success)
            .fold(U256::ZERO, |acc, o| acc.saturating_add(o.amount));

        if failed > 0 {
            warn!(target: targets::CYCLE, failed, "Cycle completed with failed orders");
        }
        info!(
            target: targets::CYCLE,
            succeeded,
            failed,
            used = %format_amount(total_amount_used, NATIVE_DECIMALS),
            "Cycle complete"
        );

        Ok(CycleResult {
            status: CycleStatus::Completed,
            timestamp: chrono::Utc::now(),
            total_balance: balance_str,
            amount_to_bridge: Some(amount_to_bridge),
            attempted: outcomes.len(),
            succeeded,
            failed,
            skipped_low_min: allocation.skipped_count,
            skipped_zero_weight: allocation.skipped_zero_weight,
            total_amount_used,
            unassigned_remainder: allocation.unassigned_remainder,
            truncation_loss: allocation.truncation_loss,
            outcomes,
        })
    }
}
