use candid::CandidType;
use serde::{Deserialize, Serialize};

use crate::constants::{
    BASE_HIGH_CHANCE, BASE_LOW_CHANCE, BASE_MID_CHANCE, HIGH_BAND_RANGE, LOW_BAND_RANGE,
    MAX_SHARE_VALUE, MID_BAND_RANGE, MIN_SHARE_VALUE, TARGET_CPA,
};
use crate::utils::error::{ManagerError, ManagerResult};

/// Reward participation state of a user
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewardStatus {
    /// Excluded from the free-share program
    Ineligible,
    /// Entitled to claim a free share
    Eligible,
    /// Has already received a free share
    Claimed,
}

/// A user of the free-share program.
/// Users are provisioned externally; only fulfillment moves them
/// from `Eligible` to `Claimed`.
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: u64,
    pub reward_status: RewardStatus,
}

/// A symbol the brokerage lists for trading
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TradableAsset {
    pub symbol: String,
}

/// A tradable asset together with the quote it was selected at
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Stock {
    pub symbol: String,
    pub price: f64,
}

/// Venue schedule snapshot as reported by the brokerage.
/// Opening times are epoch seconds.
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MarketStatus {
    pub open: bool,
    pub next_open: u64,
    pub next_close: u64,
}

/// A position held in a user's brokerage account
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AccountPosition {
    pub symbol: String,
    pub quantity: u32,
    pub share_price: f64,
}

/// Side of a brokerage order
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Lifecycle state of a brokerage order
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderStatus {
    Open,
    Filled,
    Failed,
}

/// A brokerage order as reported by the order listing endpoint
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderDetails {
    pub id: String,
    pub symbol: String,
    pub quantity: u32,
    pub side: OrderSide,
    pub status: OrderStatus,
    pub filled_price: f64,
}

/// One price band: its selection chance and its inclusive price interval
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DistributionRange {
    pub chance: f64,
    pub min: f64,
    pub max: f64,
}

impl DistributionRange {
    /// Whether `price` falls inside this band's inclusive interval
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

/// The three price bands in ascending price order
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DistributionLevel {
    pub low: DistributionRange,
    pub mid: DistributionRange,
    pub high: DistributionRange,
}

impl DistributionLevel {
    /// Bands in declared order. The cumulative walk of the range sampler
    /// depends on this ordering.
    pub fn bands(&self) -> [DistributionRange; 3] {
        [self.low, self.mid, self.high]
    }

    /// Sum of the three band chances
    pub fn total_chance(&self) -> f64 {
        self.low.chance + self.mid.chance + self.high.chance
    }
}

/// Running cost aggregate of the reward program.
/// Both fields only ever grow; fulfillment is the single writer.
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct CpaLedger {
    pub total_spent: f64,
    pub shares_given: u64,
}

impl CpaLedger {
    /// The running actual cost-per-acquisition. Bootstraps to the target
    /// while no share has been granted yet, so the very first allocation
    /// is unbiased and the division is well defined.
    pub fn current_cpa(&self, target_cpa: f64) -> f64 {
        if self.shares_given > 0 {
            self.total_spent / self.shares_given as f64
        } else {
            target_cpa
        }
    }

    /// Records one granted share at the given price
    pub fn credit(&mut self, price: f64) {
        self.total_spent += price;
        self.shares_given += 1;
    }
}

/// Allocator configuration, constructed once at install time and passed
/// into the components by reference.
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct RewardConfig {
    /// Lower bound of the overall reward price envelope
    pub min_share_value: f64,
    /// Upper bound of the overall reward price envelope
    pub max_share_value: f64,
    /// Cost-per-acquisition the allocator steers towards
    pub target_cpa: f64,
    /// Unadjusted band distribution
    pub base_distribution: DistributionLevel,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            min_share_value: MIN_SHARE_VALUE,
            max_share_value: MAX_SHARE_VALUE,
            target_cpa: TARGET_CPA,
            base_distribution: DistributionLevel {
                low: DistributionRange {
                    chance: BASE_LOW_CHANCE,
                    min: LOW_BAND_RANGE.0,
                    max: LOW_BAND_RANGE.1,
                },
                mid: DistributionRange {
                    chance: BASE_MID_CHANCE,
                    min: MID_BAND_RANGE.0,
                    max: MID_BAND_RANGE.1,
                },
                high: DistributionRange {
                    chance: BASE_HIGH_CHANCE,
                    min: HIGH_BAND_RANGE.0,
                    max: HIGH_BAND_RANGE.1,
                },
            },
        }
    }
}

impl RewardConfig {
    /// Rejects configurations the allocator cannot operate on: a
    /// non-positive target CPA, chances outside [0, 1], an inverted
    /// global envelope, or bands that cross each other. Bands may share
    /// an inclusive boundary price, as the defaults do.
    pub fn validate(&self) -> ManagerResult<()> {
        if self.target_cpa <= 0.0 {
            return Err(ManagerError::Custom(
                "The target CPA must be positive.".to_string(),
            ));
        }

        if self.min_share_value >= self.max_share_value {
            return Err(ManagerError::Custom(
                "The overall reward range must have a positive width.".to_string(),
            ));
        }

        for band in self.base_distribution.bands() {
            if !(0.0..=1.0).contains(&band.chance) {
                return Err(ManagerError::Custom(
                    "Each band chance must lie in [0, 1].".to_string(),
                ));
            }
            if band.min > band.max {
                return Err(ManagerError::Custom(
                    "Each band must have min <= max.".to_string(),
                ));
            }
        }

        let ordered = self.base_distribution.low.max <= self.base_distribution.mid.min
            && self.base_distribution.mid.max <= self.base_distribution.high.min;
        if !ordered {
            return Err(ManagerError::Custom(
                "The price bands must be ordered low < mid < high.".to_string(),
            ));
        }

        Ok(())
    }
}
