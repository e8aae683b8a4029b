use crate::{
    broker::BrokerAccess,
    constants::MAX_RETRY_ATTEMPTS,
    journal::{JournalEntry, LogType},
    state,
    utils::error::{ManagerError, ManagerResult},
};

use super::job::FulfillmentJob;

/// Executes a pending fulfillment job to completion, detached from the
/// claim that opened it. Every attempt reuses the job id as the
/// brokerage dedupe key, so a retry can never buy a second share. A
/// conflict on the user transition is terminal; any other error is
/// retried up to the attempt cap, after which the job is marked `Failed`
/// and left for the outcome queries. Nothing here ever reaches the
/// original caller.
pub async fn run_fulfillment<B: BrokerAccess>(job_id: u64, broker: B) {
    let Some(job) = state::get_fulfillment(job_id) else {
        JournalEntry::new(
            Err(ManagerError::Custom(format!(
                "Fulfillment job {job_id} was not found in the state."
            ))),
            LogType::FulfillmentResult,
        )
        .note("The fulfillment could not be started.")
        .commit();
        return;
    };

    let mut worker = FulfillmentWorker::new(job, broker);

    for attempt in 1..=MAX_RETRY_ATTEMPTS {
        let result = worker.settle_once().await;

        JournalEntry::new(result.clone(), LogType::FulfillmentResult)
            .user(worker.job.user_id)
            .attempt(attempt)
            .note(format!(
                "Fulfillment attempt is finished. Attempt {attempt}/{MAX_RETRY_ATTEMPTS}"
            ))
            .commit();

        match result {
            Ok(()) => return,
            Err(error) => {
                // A transition conflict cannot succeed on a retry.
                let conflict = matches!(error, ManagerError::UserNotEligible { .. });
                worker.last_error = Some(error);
                if conflict {
                    break;
                }
            }
        }
    }

    worker.abandon();
    // The worker goes out of scope by this line, in any way possible.
    // When it does, Drop runs and the user's claim lock is released.
}

/// One in-flight fulfillment holding the job record and the brokerage
/// client. The claim lock acquired by the originating request is owned
/// by this worker from construction on and released by its `Drop`.
struct FulfillmentWorker<B: BrokerAccess> {
    job: FulfillmentJob,
    broker: B,
    last_error: Option<ManagerError>,
}

impl<B: BrokerAccess> FulfillmentWorker<B> {
    fn new(job: FulfillmentJob, broker: B) -> Self {
        Self {
            job,
            broker,
            last_error: None,
        }
    }

    /// One settlement attempt: place the order, then commit the user
    /// transition and the ledger credit. The two commits are synchronous
    /// state mutations, so nothing can interleave between them.
    async fn settle_once(&mut self) -> ManagerResult<()> {
        self.job.attempts += 1;
        state::put_fulfillment(&self.job);

        let order_id = self
            .broker
            .place_buy_order(self.job.user_id, &self.job.stock.symbol, 1, self.job.id)
            .await?;

        JournalEntry::new(Ok(()), LogType::Info)
            .user(self.job.user_id)
            .note(format!(
                "Buy order {} accepted for {}.",
                order_id, self.job.stock.symbol
            ))
            .commit();

        state::transition_to_claimed(self.job.user_id)?;
        let ledger = state::credit_share(self.job.stock.price);

        self.job.settle(order_id);
        state::put_fulfillment(&self.job);

        JournalEntry::new(Ok(()), LogType::Info)
            .user(self.job.user_id)
            .note(format!(
                "Reward settled. Ledger: {} shares given, {:.2} total spent.",
                ledger.shares_given, ledger.total_spent
            ))
            .commit();

        Ok(())
    }

    /// Marks the job as terminally failed with the last seen error
    fn abandon(&mut self) {
        let error = self.last_error.take().unwrap_or_else(|| {
            ManagerError::Custom("The fulfillment gave up without an error.".to_string())
        });
        self.job.fail(error);
        state::put_fulfillment(&self.job);
    }
}

impl<B: BrokerAccess> Drop for FulfillmentWorker<B> {
    /// Releases the user's claim lock when the worker goes out of scope
    fn drop(&mut self) {
        state::release_claim(self.job.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MockBrokerAccess;
    use crate::fulfillment::job::FulfillmentStatus;
    use crate::types::{RewardStatus, Stock, User};
    use futures::executor::block_on;

    fn stage_claim(user_id: u64) -> u64 {
        state::insert_user(&User {
            id: user_id,
            reward_status: RewardStatus::Eligible,
        })
        .unwrap();
        state::try_acquire_claim(user_id).unwrap();
        state::open_fulfillment(
            user_id,
            Stock {
                symbol: "AAPL".to_string(),
                price: 5.0,
            },
        )
        .id
    }

    #[test]
    fn a_successful_fulfillment_settles_everything() {
        let job_id = stage_claim(1);

        let mut broker = MockBrokerAccess::new();
        broker
            .expect_place_buy_order()
            .times(1)
            .returning(|_, _, _, _| Ok("order123".to_string()));

        block_on(run_fulfillment(job_id, broker));

        assert_eq!(
            state::find_user(1).unwrap().reward_status,
            RewardStatus::Claimed
        );
        let ledger = state::ledger();
        assert_eq!(ledger.shares_given, 1);
        assert!((ledger.total_spent - 5.0).abs() < f64::EPSILON);

        let job = state::get_fulfillment(job_id).unwrap();
        assert_eq!(job.attempts, 1);
        assert!(matches!(
            job.status,
            FulfillmentStatus::Settled { ref order_id, .. } if order_id == "order123"
        ));

        // The lock is free again; a later claim attempt gets the
        // eligibility error instead of a conflict.
        assert!(state::try_acquire_claim(1).is_ok());
    }

    #[test]
    fn a_transient_order_failure_is_retried_once() {
        let job_id = stage_claim(1);

        let mut broker = MockBrokerAccess::new();
        let mut call = 0;
        broker
            .expect_place_buy_order()
            .times(2)
            .returning(move |_, _, _, _| {
                call += 1;
                if call == 1 {
                    Err(ManagerError::OrderPlacementFailed("venue hiccup".to_string()))
                } else {
                    Ok("order456".to_string())
                }
            });

        block_on(run_fulfillment(job_id, broker));

        let job = state::get_fulfillment(job_id).unwrap();
        assert_eq!(job.attempts, 2);
        assert!(matches!(job.status, FulfillmentStatus::Settled { .. }));
        assert_eq!(state::ledger().shares_given, 1);
    }

    #[test]
    fn exhausted_retries_fail_the_job_and_keep_the_user_eligible() {
        let job_id = stage_claim(1);

        let mut broker = MockBrokerAccess::new();
        broker
            .expect_place_buy_order()
            .times(usize::from(MAX_RETRY_ATTEMPTS))
            .returning(|_, _, _, _| {
                Err(ManagerError::OrderPlacementFailed("venue down".to_string()))
            });

        block_on(run_fulfillment(job_id, broker));

        assert_eq!(
            state::find_user(1).unwrap().reward_status,
            RewardStatus::Eligible
        );
        assert_eq!(state::ledger().shares_given, 0);

        let job = state::get_fulfillment(job_id).unwrap();
        assert!(matches!(
            job.status,
            FulfillmentStatus::Failed {
                error: ManagerError::OrderPlacementFailed(_),
                ..
            }
        ));

        // The lock is released, so the user can retry the claim.
        assert!(state::try_acquire_claim(1).is_ok());
    }

    #[test]
    fn a_transition_conflict_is_terminal() {
        let job_id = stage_claim(1);
        // Another fulfillment won the race for this user.
        state::transition_to_claimed(1).unwrap();

        let mut broker = MockBrokerAccess::new();
        broker
            .expect_place_buy_order()
            .times(1)
            .returning(|_, _, _, _| Ok("order789".to_string()));

        block_on(run_fulfillment(job_id, broker));

        let job = state::get_fulfillment(job_id).unwrap();
        assert!(matches!(
            job.status,
            FulfillmentStatus::Failed {
                error: ManagerError::UserNotEligible { .. },
                ..
            }
        ));
        // The conflicting attempt must not credit the ledger again.
        assert_eq!(state::ledger().shares_given, 0);
    }

    #[test]
    fn a_missing_job_is_journaled_and_skipped() {
        let broker = MockBrokerAccess::new();
        block_on(run_fulfillment(99, broker));
        assert_eq!(state::ledger().shares_given, 0);
    }
}
