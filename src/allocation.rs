//! Pro-rata allocation of a transferable amount across weighted holders.
//!
//! Everything here is integer arithmetic on `U256`. A holder's share of the
//! total weight is first fixed to [`SHARE_PRECISION`] parts, then applied to
//! the total, so every amount is floored twice and the sum of the entries can
//! never exceed the total.

use alloy::primitives::U256;
use tracing::{debug, warn};

use crate::{
    consts::SHARE_PRECISION,
    helpers::{format_amount, short_address},
    logging::targets,
    Allocation, AllocationEntry, HolderRecord,
};

/// Split `total` (base units) across `holders` in proportion to their balances.
///
/// - zero or unparsable balances are skipped and counted in `skipped_zero_weight`
/// - shares below `min_order` are dropped and added to `unassigned_remainder`
/// - whatever the floors lose is reported as `truncation_loss`
///
/// Entries keep the input order.
pub fn allocate(total: U256, holders: &[HolderRecord], min_order: U256) -> Allocation {
    let weights: Vec<Option<U256>> = holders.iter().map(weight_of).collect();
    let skipped_zero_weight = weights.iter().filter(|w| w.is_none()).count();

    let sum_weights = weights
        .iter()
        .flatten()
        .fold(U256::ZERO, |acc, w| acc.saturating_add(*w));

    if holders.is_empty() || sum_weights.is_zero() {
        debug!(
            target: targets::ALLOCATION,
            holders = holders.len(),
            "No positive holder weight, nothing to allocate"
        );
        return Allocation::unallocated(total, skipped_zero_weight);
    }

    let precision = U256::from(SHARE_PRECISION);
    let mut entries = Vec::with_capacity(holders.len());
    let mut unassigned_remainder = U256::ZERO;
    let mut skipped_count = 0usize;

    for (holder, weight) in holders.iter().zip(weights) {
        let Some(weight) = weight else {
            continue;
        };

        let share = weight.saturating_mul(precision) / sum_weights;
        let amount = total.saturating_mul(share) / precision;

        if amount < min_order {
            debug!(
                target: targets::ALLOCATION,
                holder = %short_address(&holder.address.to_string()),
                share = %format_amount(amount, 18),
                "Share below minimum order, skipping"
            );
            unassigned_remainder += amount;
            skipped_count += 1;
            continue;
        }

        let percentage = holder
            .percentage
            .or_else(|| Some(derived_percentage(weight, sum_weights)));

        entries.push(AllocationEntry {
            address: holder.address,
            amount,
            rank: holder.rank,
            percentage,
        });
    }

    let allocated = entries
        .iter()
        .fold(U256::ZERO, |acc, e| acc.saturating_add(e.amount));
    let truncation_loss = total.saturating_sub(allocated.saturating_add(unassigned_remainder));

    Allocation {
        entries,
        unassigned_remainder,
        skipped_count,
        skipped_zero_weight,
        truncation_loss,
    }
}

fn weight_of(holder: &HolderRecord) -> Option<U256> {
    match holder.weight() {
        Some(w) if !w.is_zero() => Some(w),
        Some(_) => None,
        None => {
            warn!(
                target: targets::ALLOCATION,
                holder = %holder.address,
                balance = %holder.balance,
                "Unparsable holder balance, treating as zero weight"
            );
            None
        }
    }
}

/// Percentage of the summed weight, for reporting only.
fn derived_percentage(weight: U256, sum_weights: U256) -> f64 {
    // basis points of a basis point keeps 6 significant decimals in the f64
    let scaled = weight.saturating_mul(U256::from(100_000_000u64)) / sum_weights;
    let scaled: u64 = scaled.try_into().unwrap_or(u64::MAX);
    scaled as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;
    use crate::helpers::parse_amount;

    fn holder(byte: u8, balance: &str, rank: u32) -> HolderRecord {
        HolderRecord::new(Address::repeat_byte(byte), balance, rank)
    }

    fn ether(s: &str) -> U256 {
        parse_amount(s, 18).unwrap()
    }

    fn assert_conserved(total: U256, alloc: &Allocation) {
        let sum = alloc.allocated_total();
        assert!(sum <= total);
        assert_eq!(
            sum + alloc.unassigned_remainder + alloc.truncation_loss,
            total,
            "allocation must account for every base unit"
        );
    }

    #[test]
    fn test_empty_holders() {
        let total = ether("9.5");
        let alloc = allocate(total, &[], ether("0.006"));
        assert!(alloc.entries.is_empty());
        assert_eq!(alloc.unassigned_remainder, total);
        assert_eq!(alloc.skipped_count, 0);
    }

    #[test]
    fn test_all_zero_weights() {
        let total = ether("1");
        let holders = vec![holder(1, "0", 1), holder(2, "0.0", 2)];
        let alloc = allocate(total, &holders, U256::ZERO);
        assert!(alloc.entries.is_empty());
        assert_eq!(alloc.unassigned_remainder, total);
        assert_eq!(alloc.skipped_count, 0);
        assert_eq!(alloc.skipped_zero_weight, 2);
    }

    #[test]
    fn test_sixty_forty_split() {
        let total = ether("9.5");
        let holders = vec![holder(1, "6000", 1), holder(2, "4000", 2)];
        let alloc = allocate(total, &holders, ether("0.006"));

        assert_eq!(alloc.entries.len(), 2);
        assert_eq!(alloc.entries[0].amount, ether("5.7"));
        assert_eq!(alloc.entries[1].amount, ether("3.8"));
        assert_eq!(alloc.entries[0].rank, 1);
        assert_eq!(alloc.entries[0].percentage, Some(60.0));
        assert_eq!(alloc.unassigned_remainder, U256::ZERO);
        assert_conserved(total, &alloc);
    }

    #[test]
    fn test_three_to_two_ratio() {
        let total = U256::from(1_000_003u64);
        let holders = vec![holder(1, "3", 1), holder(2, "2", 2)];
        let alloc = allocate(total, &holders, U256::ZERO);

        let a = alloc.entries[0].amount.to::<u64>() as f64;
        let b = alloc.entries[1].amount.to::<u64>() as f64;
        assert!((a / b - 1.5).abs() < 1e-5);
        assert_conserved(total, &alloc);
    }

    #[test]
    fn test_below_minimum_goes_to_remainder() {
        let total = ether("9.5");
        let holders = vec![
            holder(1, "9990", 1),
            holder(2, "5", 2),
            holder(3, "5", 3),
        ];
        // 0.05% of 9.5 = 0.00475, below 0.006
        let min = ether("0.006");
        let alloc = allocate(total, &holders, min);

        assert_eq!(alloc.entries.len(), 1);
        assert_eq!(alloc.skipped_count, 2);
        assert_eq!(alloc.unassigned_remainder, ether("0.0095"));
        assert!(alloc.entries.iter().all(|e| e.amount >= min));
        assert_conserved(total, &alloc);
    }

    #[test]
    fn test_zero_and_invalid_balances_skipped() {
        let total = ether("1");
        let holders = vec![
            holder(1, "100", 1),
            holder(2, "0", 2),
            holder(3, "not-a-number", 3),
            holder(4, "100", 4),
        ];
        let alloc = allocate(total, &holders, U256::ZERO);

        assert_eq!(alloc.entries.len(), 2);
        assert_eq!(alloc.skipped_zero_weight, 2);
        assert_eq!(alloc.skipped_count, 0);
        assert_eq!(alloc.entries[0].address, Address::repeat_byte(1));
        assert_eq!(alloc.entries[1].address, Address::repeat_byte(4));
        assert_eq!(alloc.entries[0].amount, ether("0.5"));
    }

    #[test]
    fn test_truncation_tracked_separately() {
        // three equal holders of 100 wei: share = 333_333_333 ppb → 33 wei each
        let total = U256::from(100u64);
        let holders = vec![holder(1, "1", 1), holder(2, "1", 2), holder(3, "1", 3)];
        let alloc = allocate(total, &holders, U256::ZERO);

        assert_eq!(alloc.entries.len(), 3);
        assert!(alloc.entries.iter().all(|e| e.amount == U256::from(33u64)));
        assert_eq!(alloc.unassigned_remainder, U256::ZERO);
        assert_eq!(alloc.truncation_loss, U256::from(1u64));
        assert_conserved(total, &alloc);
    }

    #[test]
    fn test_input_order_preserved() {
        let total = ether("10");
        let holders = vec![holder(3, "10", 3), holder(1, "30", 1), holder(2, "20", 2)];
        let alloc = allocate(total, &holders, U256::ZERO);
        let ranks: Vec<u32> = alloc.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![3, 1, 2]);
    }

    #[test]
    fn test_source_percentage_preferred() {
        let total = ether("1");
        let mut h = holder(1, "50", 1);
        h.percentage = Some(12.5);
        let alloc = allocate(total, &[h, holder(2, "50", 2)], U256::ZERO);
        assert_eq!(alloc.entries[0].percentage, Some(12.5));
        assert_eq!(alloc.entries[1].percentage, Some(50.0));
    }

    #[test]
    fn test_many_holders_never_exceed_total() {
        let total = ether("9.5");
        let holders: Vec<HolderRecord> = (1..=100u32)
            .map(|i| holder(i as u8, &format!("{}.{}", 1000 / i, i), i))
            .collect();
        let min = ether("0.006");
        let alloc = allocate(total, &holders, min);

        assert!(alloc.entries.iter().all(|e| e.amount >= min));
        assert_eq!(alloc.entries.len() + alloc.skipped_count, 100);
        assert_conserved(total, &alloc);
        // one floor per holder at 1e-9 share precision
        let bound = total / U256::from(SHARE_PRECISION) * U256::from(100u64) + U256::from(100u64);
        assert!(alloc.truncation_loss <= bound);
    }
}
