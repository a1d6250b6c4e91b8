//! Fixed-point commission arithmetic.
//!
//! Amounts are integer minor currency units (paise) and rates are basis
//! points, so 100 bps == 1% and 10 000 bps == 100%. Intermediate products
//! are computed in i128.

use serde::{Deserialize, Serialize};

use crate::models::commission::{CommissionRates, Tier};

pub const BPS_DENOMINATOR: i64 = 10_000;

/// Minor units per major unit (paise per rupee).
pub const MINOR_PER_MAJOR: i64 = 100;

/// Share of one tier before beneficiaries are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierShare {
    pub tier: Tier,
    pub rate_bps: i64,
    pub amount: i64,
}

/// `amount * bps / 10000`, rounded half up.
pub fn percent_of_bps(amount: i64, bps: i64) -> i64 {
    let raw = amount as i128 * bps as i128;
    let half = (BPS_DENOMINATOR / 2) as i128;
    ((raw + half) / BPS_DENOMINATOR as i128) as i64
}

/// Split `amount` across the tiers that have a non-zero rate.
///
/// When the tier rates add up to `total_bps`, the remainders are handed out
/// by the largest-remainder method so the shares sum to exactly
/// `percent_of_bps(amount, total_bps)`. Ties go to the higher tier.
/// Otherwise each share is rounded on its own.
pub fn split_shares(amount: i64, rates: &CommissionRates) -> Vec<TierShare> {
    let active: Vec<(Tier, i64)> = Tier::ALL
        .iter()
        .map(|t| (*t, rates.bps_for(*t)))
        .filter(|(_, bps)| *bps > 0)
        .collect();

    if !rates.is_balanced() {
        return active
            .into_iter()
            .map(|(tier, bps)| TierShare {
                tier,
                rate_bps: bps,
                amount: percent_of_bps(amount, bps),
            })
            .collect();
    }

    let denom = BPS_DENOMINATOR as i128;
    let mut shares = Vec::with_capacity(active.len());
    let mut remainders = Vec::with_capacity(active.len());

    for (idx, (tier, bps)) in active.iter().enumerate() {
        let raw = amount as i128 * *bps as i128;
        shares.push(TierShare {
            tier: *tier,
            rate_bps: *bps,
            amount: (raw / denom) as i64,
        });
        remainders.push((raw % denom, idx));
    }

    let floored: i64 = shares.iter().map(|s| s.amount).sum();
    let leftover = percent_of_bps(amount, rates.total_bps) - floored;

    // Stable sort keeps tier order among equal remainders.
    remainders.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, idx) in remainders.into_iter().take(leftover.max(0) as usize) {
        shares[idx].amount += 1;
    }

    shares
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates(a: i64, b: i64, t: i64, ag: i64, u: i64) -> CommissionRates {
        CommissionRates {
            admin_bps: a,
            branch_bps: b,
            taluk_bps: t,
            agent_bps: ag,
            user_bps: u,
            total_bps: a + b + t + ag + u,
        }
    }

    #[test]
    fn test_percent_of_bps_rounds_half_up() {
        assert_eq!(percent_of_bps(100_000, 100), 1_000);
        assert_eq!(percent_of_bps(150, 100), 2); // 1.5 -> 2
        assert_eq!(percent_of_bps(149, 100), 1);
        assert_eq!(percent_of_bps(0, 500), 0);
    }

    #[test]
    fn test_five_equal_tiers() {
        // 1000.00 at 1% per tier
        let shares = split_shares(100_000, &rates(100, 100, 100, 100, 100));
        assert_eq!(shares.len(), 5);
        assert!(shares.iter().all(|s| s.amount == 1_000));
        assert_eq!(shares.iter().map(|s| s.amount).sum::<i64>(), 5_000);
    }

    #[test]
    fn test_largest_remainder_hits_total_exactly() {
        // 3 tiers at 0.33% each of 1.01: raw shares 0.3333 each
        let r = rates(33, 33, 33, 0, 0);
        for amount in [101, 999, 12_345, 7, 1_000_001] {
            let shares = split_shares(amount, &r);
            let sum: i64 = shares.iter().map(|s| s.amount).sum();
            assert_eq!(sum, percent_of_bps(amount, r.total_bps), "amount {}", amount);
        }
    }

    #[test]
    fn test_leftover_goes_to_largest_remainder() {
        let r = rates(600, 400, 0, 0, 0);
        let shares = split_shares(100, &r); // 6.0 and 4.0, no leftover
        assert_eq!(shares[0].amount, 6);
        assert_eq!(shares[1].amount, 4);

        let shares = split_shares(1, &r); // raw .06 and .04, target round(.1) = 0
        assert_eq!(shares.iter().map(|s| s.amount).sum::<i64>(), 0);

        let shares = split_shares(9, &r); // raw .54 and .36, target round(.9) = 1
        assert_eq!(shares[0].amount, 1);
        assert_eq!(shares[1].amount, 0);
    }

    #[test]
    fn test_unbalanced_rates_round_each_share() {
        let r = CommissionRates {
            admin_bps: 150,
            branch_bps: 150,
            taluk_bps: 0,
            agent_bps: 0,
            user_bps: 0,
            total_bps: 500,
        };
        let shares = split_shares(100, &r); // 1.5 each
        assert_eq!(shares.iter().map(|s| s.amount).collect::<Vec<_>>(), vec![2, 2]);
    }

    #[test]
    fn test_zero_rate_tiers_are_skipped() {
        let shares = split_shares(100_000, &rates(100, 0, 0, 200, 0));
        let tiers: Vec<Tier> = shares.iter().map(|s| s.tier).collect();
        assert_eq!(tiers, vec![Tier::Admin, Tier::Agent]);
    }
}
