use candid::Principal;
use ic_canister::{generate_idl, init, query, update, Canister, Idl, PreUpdate};
use ic_exports::ic_cdk::caller;

use crate::{
    api,
    broker::BrokerService,
    fulfillment::job::FulfillmentJob,
    journal::JournalEntry,
    state,
    timers::start_timers,
    types::{AccountPosition, CpaLedger, OrderDetails, RewardConfig, Stock, User},
    utils::{
        common::only_controller,
        error::{ManagerError, ManagerResult},
    },
};

#[derive(Canister)]
pub struct RewardManager {
    #[id]
    id: Principal,
}

impl PreUpdate for RewardManager {}

impl RewardManager {
    // INITIALIZATION
    #[init]
    pub fn init(&mut self, broker_principal: Principal, config: Option<RewardConfig>) {
        let config = config.unwrap_or_default();
        config
            .validate()
            .expect("the reward configuration must be valid");

        state::set_broker(BrokerService(broker_principal));
        state::set_config(config);

        start_timers();
    }

    /// Grants the given user their one free share. Returns the selected
    /// stock while the purchase and the state commit are still in
    /// flight; the fulfillment outcome is observable through
    /// `get_fulfillment`.
    #[update]
    pub async fn claim_free_share(&mut self, user_id: u64) -> ManagerResult<Stock> {
        api::claim_free_share(user_id).await
    }

    /// Pre-provisions users. Refuses the whole batch if any id is
    /// already registered.
    #[update]
    pub fn register_users(&mut self, users: Vec<User>) -> ManagerResult<u64> {
        only_controller(caller())?;

        for user in &users {
            if state::find_user(user.id).is_some() {
                return Err(ManagerError::Custom(format!(
                    "User {} is already registered.",
                    user.id
                )));
            }
        }

        let count = users.len() as u64;
        for user in users {
            state::insert_user(&user)?;
        }
        Ok(count)
    }

    #[query]
    pub fn get_user(&self, user_id: u64) -> ManagerResult<User> {
        state::find_user(user_id).ok_or(ManagerError::UserNotFound(user_id))
    }

    #[query]
    pub fn get_ledger(&self) -> CpaLedger {
        state::ledger()
    }

    /// The fulfillment-outcome channel for one job
    #[query]
    pub fn get_fulfillment(&self, job_id: u64) -> ManagerResult<FulfillmentJob> {
        state::get_fulfillment(job_id).ok_or(ManagerError::Custom(format!(
            "Fulfillment job {job_id} was not found."
        )))
    }

    /// Every fulfillment ever opened for a user
    #[query]
    pub fn get_user_fulfillments(&self, user_id: u64) -> Vec<FulfillmentJob> {
        state::user_fulfillments(user_id)
    }

    /// The `count` most recent journal entries
    #[query]
    pub fn get_journal(&self, count: u64) -> Vec<JournalEntry> {
        state::journal_entries(count)
    }

    /// Positions held in the user's brokerage account
    #[update]
    pub async fn get_account_positions(
        &mut self,
        user_id: u64,
    ) -> ManagerResult<Vec<AccountPosition>> {
        api::account_positions(user_id).await
    }

    /// All brokerage orders placed for the user's account
    #[update]
    pub async fn get_orders(&mut self, user_id: u64) -> ManagerResult<Vec<OrderDetails>> {
        api::list_orders(user_id).await
    }

    pub fn idl() -> Idl {
        generate_idl!()
    }
}
