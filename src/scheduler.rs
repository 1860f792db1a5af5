//! Batch scheduler: bounded-concurrency submission with inter-batch pacing.
//!
//! Entries are split into consecutive groups of `concurrency`. A group's
//! submissions run together on the current task (`join_all`, no spawning)
//! and the next group starts only after every member settled and the
//! inter-batch delay elapsed.

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::{
    helpers::short_address, logging::targets, AllocationEntry, OrderError, OrderOutcome,
    OrderReceipt,
};

/// Batch sizing and pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Submissions in flight per batch (0 is treated as 1)
    pub concurrency: usize,
    /// Pause between consecutive batches
    pub inter_batch_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            inter_batch_delay: Duration::from_millis(2000),
        }
    }
}

/// Submit every entry, returning one outcome per entry in input order.
///
/// A failing submission is recorded as a failed outcome; it never cancels
/// or delays its siblings.
pub async fn run_batches<F, Fut>(
    entries: &[AllocationEntry],
    config: BatchConfig,
    submit: F,
) -> Vec<OrderOutcome>
where
    F: Fn(AllocationEntry) -> Fut,
    Fut: Future<Output = Result<OrderReceipt, OrderError>>,
{
    let concurrency = config.concurrency.max(1);
    let batch_count = entries.len().div_ceil(concurrency);
    let mut outcomes = Vec::with_capacity(entries.len());

    info!(
        target: targets::SCHEDULER,
        entries = entries.len(),
        concurrency,
        batches = batch_count,
        "Processing allocations"
    );

    for (index, batch) in entries.chunks(concurrency).enumerate() {
        debug!(
            target: targets::SCHEDULER,
            batch = index + 1,
            orders = batch.len(),
            "Starting batch"
        );

        let submissions = batch.iter().map(|entry| {
            let fut = submit(entry.clone());
            async move {
                match fut.await {
                    Ok(receipt) => {
                        info!(
                            target: targets::SCHEDULER,
                            recipient = %short_address(&entry.address.to_string()),
                            tx_hash = %receipt.transaction_hash,
                            "Order succeeded"
                        );
                        OrderOutcome::succeeded(entry, receipt)
                    }
                    Err(err) => {
                        warn!(
                            target: targets::SCHEDULER,
                            recipient = %short_address(&entry.address.to_string()),
                            kind = %err.kind,
                            error = %err.message,
                            "Order failed"
                        );
                        OrderOutcome::failed(entry, &err)
                    }
                }
            }
        });

        // join_all yields results in submission order regardless of completion order
        outcomes.extend(join_all(submissions).await);

        if index + 1 < batch_count && !config.inter_batch_delay.is_zero() {
            debug!(
                target: targets::SCHEDULER,
                delay_ms = config.inter_batch_delay.as_millis() as u64,
                "Waiting before next batch"
            );
            tokio::time::sleep(config.inter_batch_delay).await;
        }
    }

    outcomes
}
