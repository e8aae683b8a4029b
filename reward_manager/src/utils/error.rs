use candid::CandidType;
use ic_exports::ic_kit::RejectionCode;
use serde::Deserialize;

use crate::types::RewardStatus;

/// Reward Manager Canister Result
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Reward Manager Canister Errors
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub enum ManagerError {
    /// `CallResult` error
    CallResult(RejectionCode, String),
    /// Unauthorized access
    Unauthorized,
    /// No user is registered under the given id
    UserNotFound(u64),
    /// The user's reward state does not allow a claim
    UserNotEligible {
        /// Id of the rejected user
        user_id: u64,
        /// The reward state the user was found in
        status: RewardStatus,
    },
    /// The trading venue is closed
    MarketClosed {
        /// Next scheduled opening time, in epoch seconds
        next_open: u64,
    },
    /// The brokerage has no quote for the given symbol
    PriceNotFound(String),
    /// The sampled price band contains no tradable asset
    NoEligibleAssets,
    /// The brokerage rejected the buy order
    OrderPlacementFailed(String),
    /// A claim for this user is already in flight
    ClaimInProgress,
    /// Unknown/Custom error
    Custom(String),
}
