//! The eligibility gate in front of the allocation pipeline.

use crate::{
    broker::BrokerAccess,
    state,
    types::{RewardStatus, User},
    utils::error::{ManagerError, ManagerResult},
};

/// Validates a user's reward state and the venue schedule before any
/// allocation work is done. Pure read-and-check: the user checks run
/// synchronously before the market clock is consulted, so an already
/// claimed user never triggers an external call.
pub async fn admit<B: BrokerAccess>(user_id: u64, broker: &B) -> ManagerResult<User> {
    let user = state::find_user(user_id).ok_or(ManagerError::UserNotFound(user_id))?;

    if user.reward_status != RewardStatus::Eligible {
        return Err(ManagerError::UserNotEligible {
            user_id,
            status: user.reward_status,
        });
    }

    let market = broker.market_status().await?;
    if !market.open {
        return Err(ManagerError::MarketClosed {
            next_open: market.next_open,
        });
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MockBrokerAccess;
    use crate::types::MarketStatus;
    use futures::executor::block_on;

    fn open_market() -> MarketStatus {
        MarketStatus {
            open: true,
            next_open: 1_700_030_000,
            next_close: 1_700_020_000,
        }
    }

    #[test]
    fn unknown_users_are_rejected_without_broker_calls() {
        // A mock with no expectations panics on any call.
        let broker = MockBrokerAccess::new();
        let result = block_on(admit(404, &broker));
        assert_eq!(result, Err(ManagerError::UserNotFound(404)));
    }

    #[test]
    fn claimed_users_are_rejected_without_broker_calls() {
        state::insert_user(&User {
            id: 1,
            reward_status: RewardStatus::Claimed,
        })
        .unwrap();

        let broker = MockBrokerAccess::new();
        let result = block_on(admit(1, &broker));
        assert_eq!(
            result,
            Err(ManagerError::UserNotEligible {
                user_id: 1,
                status: RewardStatus::Claimed,
            })
        );
    }

    #[test]
    fn closed_market_reports_the_next_opening_time() {
        state::insert_user(&User {
            id: 1,
            reward_status: RewardStatus::Eligible,
        })
        .unwrap();

        let mut broker = MockBrokerAccess::new();
        broker.expect_market_status().returning(|| {
            Ok(MarketStatus {
                open: false,
                next_open: 1_700_030_000,
                next_close: 1_700_020_000,
            })
        });

        let result = block_on(admit(1, &broker));
        assert_eq!(
            result,
            Err(ManagerError::MarketClosed {
                next_open: 1_700_030_000,
            })
        );
    }

    #[test]
    fn eligible_users_are_admitted_while_the_market_is_open() {
        state::insert_user(&User {
            id: 1,
            reward_status: RewardStatus::Eligible,
        })
        .unwrap();

        let mut broker = MockBrokerAccess::new();
        broker.expect_market_status().returning(|| Ok(open_market()));

        let user = block_on(admit(1, &broker)).unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.reward_status, RewardStatus::Eligible);
    }
}
