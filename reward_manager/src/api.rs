//! The claim orchestration: gate, lock, adjust, sample, then hand off to
//! the detached fulfillment. The caller gets the selected stock back
//! while the fulfillment is still in flight, so a successful response is
//! a valid selection, not a settled reward.

use ic_exports::ic_cdk::spawn;
use rand::Rng;

use crate::{
    broker::BrokerAccess,
    distribution, eligibility,
    fulfillment::run::run_fulfillment,
    journal::{JournalEntry, LogType},
    sampler, state,
    types::{AccountPosition, OrderDetails, RewardConfig, Stock},
    utils::error::{ManagerError, ManagerResult},
};

/// Entry point behind the `claim_free_share` endpoint. Allocation errors
/// surface to the caller; fulfillment errors never do.
pub async fn claim_free_share(user_id: u64) -> ManagerResult<Stock> {
    let broker = state::broker();
    let config = state::config();
    let mut rng = state::request_rng();

    let (stock, job_id) = claim_flow(user_id, &broker, &config, &mut rng).await?;
    spawn(run_fulfillment(job_id, broker));
    Ok(stock)
}

/// The synchronous half of a claim: admit the user, take their claim
/// lock, select a stock, and persist a `Pending` fulfillment job.
/// Returns with the lock still held; ownership of its release moves to
/// the fulfillment worker. On any allocation error the lock is released
/// before the error propagates.
pub async fn claim_flow<B: BrokerAccess, R: Rng>(
    user_id: u64,
    broker: &B,
    config: &RewardConfig,
    rng: &mut R,
) -> ManagerResult<(Stock, u64)> {
    let user = eligibility::admit(user_id, broker).await?;
    state::try_acquire_claim(user.id)?;

    match allocate(broker, config, rng).await {
        Ok(stock) => {
            let job = state::open_fulfillment(user.id, stock.clone());
            JournalEntry::new(Ok(()), LogType::ClaimResult)
                .user(user.id)
                .note(format!(
                    "Selected {} at {:.2}. Fulfillment job {} opened.",
                    stock.symbol, stock.price, job.id
                ))
                .commit();
            Ok((stock, job.id))
        }
        Err(error) => {
            state::release_claim(user.id);
            JournalEntry::new(Err(error.clone()), LogType::ClaimResult)
                .user(user.id)
                .note("The allocation failed before a stock could be selected.")
                .commit();
            Err(error)
        }
    }
}

/// Adjusts the band distribution against the current ledger snapshot and
/// runs the sampling pipeline over it
async fn allocate<B: BrokerAccess, R: Rng>(
    broker: &B,
    config: &RewardConfig,
    rng: &mut R,
) -> ManagerResult<Stock> {
    let ledger = state::ledger();
    let distribution = distribution::adjust(&ledger, config.target_cpa, &config.base_distribution);
    sampler::select_reward_stock(broker, config, &distribution, rng).await
}

/// Positions held in the user's brokerage account
pub async fn account_positions(user_id: u64) -> ManagerResult<Vec<AccountPosition>> {
    state::find_user(user_id).ok_or(ManagerError::UserNotFound(user_id))?;
    state::broker().account_positions(user_id).await
}

/// All brokerage orders placed for the user's account
pub async fn list_orders(user_id: u64) -> ManagerResult<Vec<OrderDetails>> {
    state::find_user(user_id).ok_or(ManagerError::UserNotFound(user_id))?;
    state::broker().list_orders(user_id).await
}
