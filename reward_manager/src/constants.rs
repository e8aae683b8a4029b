//! Reward Manager's Constants

use chrono::Duration;

/// Default lower bound of the overall reward price envelope, in dollars
pub const MIN_SHARE_VALUE: f64 = 3.0;

/// Default upper bound of the overall reward price envelope, in dollars
pub const MAX_SHARE_VALUE: f64 = 200.0;

/// Default cost-per-acquisition the allocator steers towards, in dollars
pub const TARGET_CPA: f64 = 10.0;

/// Default selection chance of the low price band
pub const BASE_LOW_CHANCE: f64 = 0.95;

/// Default selection chance of the mid price band
pub const BASE_MID_CHANCE: f64 = 0.03;

/// Default selection chance of the high price band
pub const BASE_HIGH_CHANCE: f64 = 0.02;

/// Default price interval of the low band
pub const LOW_BAND_RANGE: (f64, f64) = (3.0, 10.0);

/// Default price interval of the mid band
pub const MID_BAND_RANGE: (f64, f64) = (10.0, 25.0);

/// Default price interval of the high band
pub const HIGH_BAND_RANGE: (f64, f64) = (25.0, 200.0);

/// Hard cap on how far one adjustment can move the band chances.
/// Bounds the allocator's reaction speed so a single expensive grant
/// cannot swing the distribution.
pub const MAX_DISTRIBUTION_DELTA: f64 = 0.01;

/// Max number of fulfillment attempts per claim
pub const MAX_RETRY_ATTEMPTS: u8 = 2;

/// Timeout after which an abandoned claim lock is reclaimable, in seconds
pub fn claim_lock_timeout() -> u64 {
    Duration::hours(1).num_seconds() as u64
}

/// Lifetime of a cached tradable-asset catalog, in seconds
pub fn asset_cache_ttl() -> u64 {
    Duration::days(1).num_seconds() as u64
}

/// Lifetime of a cached price quote, in seconds
pub fn price_cache_ttl() -> u64 {
    Duration::minutes(15).num_seconds() as u64
}

/// Max number of journal entries kept in stable storage
pub const MAX_JOURNAL_ENTRIES: u64 = 300;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_chances_sum_to_one() {
        let sum = BASE_LOW_CHANCE + BASE_MID_CHANCE + BASE_HIGH_CHANCE;
        assert!((sum - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bands_cover_the_reward_envelope() {
        assert_eq!(LOW_BAND_RANGE.0, MIN_SHARE_VALUE);
        assert_eq!(HIGH_BAND_RANGE.1, MAX_SHARE_VALUE);
        assert_eq!(LOW_BAND_RANGE.1, MID_BAND_RANGE.0);
        assert_eq!(MID_BAND_RANGE.1, HIGH_BAND_RANGE.0);
    }

    #[test]
    fn claim_lock_timeout_is_one_hour() {
        assert_eq!(claim_lock_timeout(), 3_600);
    }
}
