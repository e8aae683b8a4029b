//! The distribution controller: rebalances the band chances so the
//! running cost-per-acquisition converges to the configured target.

use crate::{
    constants::MAX_DISTRIBUTION_DELTA,
    types::{CpaLedger, DistributionLevel, DistributionRange},
};

/// Adjusts the base distribution against a ledger snapshot.
///
/// The adjustment factor is the normalized deviation of the current CPA
/// from the target: positive when the program is overspending, negative
/// when it is underspending. The resulting delta is hard-clamped so a
/// single expensive grant cannot swing the allocator. The low band
/// absorbs the whole delta while mid and high each give up half of it;
/// the chances are deliberately NOT renormalized afterwards, and the
/// price intervals pass through untouched.
///
/// Pure function of the snapshot and the configuration.
pub fn adjust(
    ledger: &CpaLedger,
    target_cpa: f64,
    base: &DistributionLevel,
) -> DistributionLevel {
    let current_cpa = ledger.current_cpa(target_cpa);
    let factor = (current_cpa - target_cpa) / target_cpa;

    let delta = (factor * (base.mid.chance + base.high.chance))
        .clamp(-MAX_DISTRIBUTION_DELTA, MAX_DISTRIBUTION_DELTA);

    DistributionLevel {
        low: DistributionRange {
            chance: base.low.chance + delta,
            ..base.low
        },
        mid: DistributionRange {
            chance: base.mid.chance - delta / 2.0,
            ..base.mid
        },
        high: DistributionRange {
            chance: base.high.chance - delta / 2.0,
            ..base.high
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RewardConfig;
    use proptest::prelude::*;

    fn base() -> DistributionLevel {
        RewardConfig::default().base_distribution
    }

    fn ledger(total_spent: f64, shares_given: u64) -> CpaLedger {
        CpaLedger {
            total_spent,
            shares_given,
        }
    }

    #[test]
    fn empty_ledger_bootstraps_to_the_base_distribution() {
        let adjusted = adjust(&ledger(0.0, 0), 10.0, &base());
        assert_eq!(adjusted, base());
    }

    #[test]
    fn on_target_cpa_leaves_the_distribution_unchanged() {
        // 10 shares at exactly the target CPA of 10
        let adjusted = adjust(&ledger(100.0, 10), 10.0, &base());
        assert_eq!(adjusted, base());
    }

    #[test]
    fn overspending_shifts_weight_to_the_low_band() {
        // current CPA 12 vs target 10 -> factor 0.2 -> raw delta 0.01
        let adjusted = adjust(&ledger(120.0, 10), 10.0, &base());
        assert!((adjusted.low.chance - 0.96).abs() < 1e-12);
        assert!((adjusted.mid.chance - 0.025).abs() < 1e-12);
        assert!((adjusted.high.chance - 0.015).abs() < 1e-12);
    }

    #[test]
    fn underspending_shifts_weight_to_the_upper_bands() {
        // current CPA 5 vs target 10 -> factor -0.5 -> clamped to -0.01
        let adjusted = adjust(&ledger(50.0, 10), 10.0, &base());
        assert!((adjusted.low.chance - 0.94).abs() < 1e-12);
        assert!((adjusted.mid.chance - 0.035).abs() < 1e-12);
        assert!((adjusted.high.chance - 0.025).abs() < 1e-12);
    }

    #[test]
    fn extreme_overspend_is_clamped() {
        let adjusted = adjust(&ledger(1_000_000.0, 1), 10.0, &base());
        assert!((adjusted.low.chance - (0.95 + MAX_DISTRIBUTION_DELTA)).abs() < 1e-12);
    }

    #[test]
    fn price_intervals_pass_through_unchanged() {
        let adjusted = adjust(&ledger(120.0, 10), 10.0, &base());
        for (adjusted_band, base_band) in adjusted.bands().iter().zip(base().bands()) {
            assert_eq!(adjusted_band.min, base_band.min);
            assert_eq!(adjusted_band.max, base_band.max);
        }
    }

    #[test]
    fn a_non_unit_base_sum_is_not_renormalized() {
        let mut skewed = base();
        skewed.high.chance = 0.01; // base now sums to 0.99
        let adjusted = adjust(&ledger(120.0, 10), 10.0, &skewed);
        assert!((adjusted.total_chance() - 0.99).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn delta_is_always_clamped(
            total_spent in 0.0f64..1_000_000.0,
            shares_given in 0u64..100_000,
            target_cpa in 0.01f64..1_000.0,
        ) {
            let adjusted = adjust(&ledger(total_spent, shares_given), target_cpa, &base());
            let delta = adjusted.low.chance - base().low.chance;
            prop_assert!(delta <= MAX_DISTRIBUTION_DELTA + 1e-12);
            prop_assert!(delta >= -MAX_DISTRIBUTION_DELTA - 1e-12);
        }

        #[test]
        fn adjustment_preserves_the_total_chance(
            total_spent in 0.0f64..1_000_000.0,
            shares_given in 0u64..100_000,
        ) {
            let adjusted = adjust(&ledger(total_spent, shares_given), 10.0, &base());
            prop_assert!((adjusted.total_chance() - base().total_chance()).abs() < 1e-9);
        }
    }
}
