//! Thread-local canister state and the narrow accessor functions the
//! components go through. The mutating accessors are synchronous critical
//! sections: under the canister's cooperative scheduler nothing can
//! interleave with them, which is what makes the user transition and the
//! ledger increment atomic.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

use ic_stable_structures::DefaultMemoryImpl;
use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

use crate::{
    broker::BrokerService,
    constants::{asset_cache_ttl, price_cache_ttl},
    fulfillment::{job::FulfillmentJob, lock::ClaimLock},
    journal::JournalEntry,
    types::{CpaLedger, RewardConfig, RewardStatus, Stock, TradableAsset, User},
    utils::{
        common::now_seconds,
        error::{ManagerError, ManagerResult},
    },
};

/// Stable-memory journal vector
pub type StableJournal = ic_stable_structures::Vec<JournalEntry, DefaultMemoryImpl>;

/// A price quote held in the cache
#[derive(Clone, Copy)]
pub struct CachedQuote {
    pub price: f64,
    pub fetched_at: u64,
}

/// A catalog snapshot held in the cache
#[derive(Clone)]
pub struct CachedCatalog {
    pub assets: Vec<TradableAsset>,
    pub fetched_at: u64,
}

thread_local! {
    /// Brokerage canister client
    pub static BROKER: RefCell<BrokerService> = RefCell::new(BrokerService::default());
    /// Allocator configuration, set once at install time
    pub static CONFIG: RefCell<RewardConfig> = RefCell::new(RewardConfig::default());
    /// Registered users by id
    pub static USERS: RefCell<HashMap<u64, User>> = RefCell::new(HashMap::new());
    /// Singleton running-cost aggregate
    pub static LEDGER: RefCell<CpaLedger> = RefCell::new(CpaLedger::default());
    /// Per-user claim locks
    pub static CLAIM_LOCKS: RefCell<HashMap<u64, ClaimLock>> = RefCell::new(HashMap::new());
    /// Fulfillment job records by job id
    pub static FULFILLMENTS: RefCell<HashMap<u64, FulfillmentJob>> = RefCell::new(HashMap::new());
    /// Next fulfillment job id
    pub static JOB_SEQUENCE: Cell<u64> = Cell::new(0);
    /// Master RNG, reseeded from the IC randomness tape
    pub static RNG: RefCell<ChaCha8Rng> = RefCell::new(ChaCha8Rng::from_seed([0; 32]));
    /// Cached tradable-asset catalog
    pub static ASSET_CACHE: RefCell<Option<CachedCatalog>> = RefCell::new(None);
    /// Cached price quotes by symbol
    pub static PRICE_CACHE: RefCell<HashMap<String, CachedQuote>> = RefCell::new(HashMap::new());
    /// Persistent journal
    pub static JOURNAL: RefCell<StableJournal> = RefCell::new(
        StableJournal::init(DefaultMemoryImpl::default())
            .expect("failed to initialize the stable journal"),
    );
}

/// Returns the brokerage client
pub fn broker() -> BrokerService {
    BROKER.with(|broker| broker.borrow().clone())
}

pub fn set_broker(broker: BrokerService) {
    BROKER.with(|cell| *cell.borrow_mut() = broker);
}

/// Returns a copy of the allocator configuration
pub fn config() -> RewardConfig {
    CONFIG.with(|config| *config.borrow())
}

pub fn set_config(config: RewardConfig) {
    CONFIG.with(|cell| *cell.borrow_mut() = config);
}

/// Looks a user up by id
pub fn find_user(user_id: u64) -> Option<User> {
    USERS.with(|users| users.borrow().get(&user_id).cloned())
}

/// Registers a user, refusing to overwrite an existing one with the same id
pub fn insert_user(user: &User) -> ManagerResult<()> {
    USERS.with(|users| {
        let mut binding = users.borrow_mut();
        if binding.contains_key(&user.id) {
            return Err(ManagerError::Custom(format!(
                "User {} is already registered.",
                user.id
            )));
        }
        binding.insert(user.id, user.clone());
        Ok(())
    })
}

/// Conditionally moves a user from `Eligible` to `Claimed`.
/// The check and the write happen inside one borrow, so a concurrent
/// fulfillment observing the same user gets a conflict error instead of
/// a second grant.
pub fn transition_to_claimed(user_id: u64) -> ManagerResult<()> {
    USERS.with(|users| {
        let mut binding = users.borrow_mut();
        let user = binding
            .get_mut(&user_id)
            .ok_or(ManagerError::UserNotFound(user_id))?;
        if user.reward_status != RewardStatus::Eligible {
            return Err(ManagerError::UserNotEligible {
                user_id,
                status: user.reward_status,
            });
        }
        user.reward_status = RewardStatus::Claimed;
        Ok(())
    })
}

/// Returns a snapshot of the cost ledger
pub fn ledger() -> CpaLedger {
    LEDGER.with(|ledger| *ledger.borrow())
}

/// Atomically records one granted share and returns the updated ledger
pub fn credit_share(price: f64) -> CpaLedger {
    LEDGER.with(|ledger| {
        let mut binding = ledger.borrow_mut();
        binding.credit(price);
        *binding
    })
}

/// Acquires the claim lock for a user, failing with `ClaimInProgress`
/// while another claim for the same user is in flight
pub fn try_acquire_claim(user_id: u64) -> ManagerResult<()> {
    CLAIM_LOCKS.with(|locks| locks.borrow_mut().entry(user_id).or_default().try_lock())
}

/// Releases the claim lock for a user
pub fn release_claim(user_id: u64) {
    CLAIM_LOCKS.with(|locks| {
        if let Some(lock) = locks.borrow_mut().get_mut(&user_id) {
            lock.unlock();
        }
    });
}

/// Opens a `Pending` fulfillment job for the given user and stock and
/// persists it before any order is placed
pub fn open_fulfillment(user_id: u64, stock: Stock) -> FulfillmentJob {
    let id = JOB_SEQUENCE.with(|sequence| {
        let next = sequence.get();
        sequence.set(next + 1);
        next
    });
    let job = FulfillmentJob::open(id, user_id, stock);
    FULFILLMENTS.with(|jobs| jobs.borrow_mut().insert(id, job.clone()));
    job
}

/// Looks a fulfillment job up by id
pub fn get_fulfillment(job_id: u64) -> Option<FulfillmentJob> {
    FULFILLMENTS.with(|jobs| jobs.borrow().get(&job_id).cloned())
}

/// Replaces a fulfillment job record
pub fn put_fulfillment(job: &FulfillmentJob) {
    FULFILLMENTS.with(|jobs| {
        jobs.borrow_mut().insert(job.id, job.clone());
    });
}

/// Returns all fulfillment jobs ever opened for a user
pub fn user_fulfillments(user_id: u64) -> Vec<FulfillmentJob> {
    FULFILLMENTS.with(|jobs| {
        let mut jobs: Vec<FulfillmentJob> = jobs
            .borrow()
            .values()
            .filter(|job| job.user_id == user_id)
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.id);
        jobs
    })
}

/// Forks a per-request RNG off the master RNG
pub fn request_rng() -> ChaCha8Rng {
    RNG.with(|rng| {
        let mut master = rng.borrow_mut();
        ChaCha8Rng::from_seed(master.gen())
    })
}

/// Replaces the master RNG with one seeded from the given bytes
pub fn seed_rng(seed: [u8; 32]) {
    RNG.with(|rng| *rng.borrow_mut() = ChaCha8Rng::from_seed(seed));
}

/// Returns the cached catalog if it is still within its lifetime
pub fn cached_assets() -> Option<Vec<TradableAsset>> {
    ASSET_CACHE.with(|cache| {
        cache.borrow().as_ref().and_then(|catalog| {
            if now_seconds().saturating_sub(catalog.fetched_at) <= asset_cache_ttl() {
                Some(catalog.assets.clone())
            } else {
                None
            }
        })
    })
}

pub fn cache_assets(assets: &[TradableAsset]) {
    ASSET_CACHE.with(|cache| {
        *cache.borrow_mut() = Some(CachedCatalog {
            assets: assets.to_vec(),
            fetched_at: now_seconds(),
        });
    });
}

/// Returns the cached quote for a symbol if it is still within its lifetime
pub fn cached_price(symbol: &str) -> Option<f64> {
    PRICE_CACHE.with(|cache| {
        cache.borrow().get(symbol).and_then(|quote| {
            if now_seconds().saturating_sub(quote.fetched_at) <= price_cache_ttl() {
                Some(quote.price)
            } else {
                None
            }
        })
    })
}

pub fn cache_price(symbol: &str, price: f64) {
    PRICE_CACHE.with(|cache| {
        cache.borrow_mut().insert(
            symbol.to_string(),
            CachedQuote {
                price,
                fetched_at: now_seconds(),
            },
        );
    });
}

/// Drops every cache entry that has outlived its lifetime
pub fn prune_caches() {
    let now = now_seconds();
    ASSET_CACHE.with(|cache| {
        let expired = cache
            .borrow()
            .as_ref()
            .is_some_and(|catalog| now.saturating_sub(catalog.fetched_at) > asset_cache_ttl());
        if expired {
            *cache.borrow_mut() = None;
        }
    });
    PRICE_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .retain(|_, quote| now.saturating_sub(quote.fetched_at) <= price_cache_ttl());
    });
}

/// Appends an entry to the persistent journal
pub fn insert_journal_entry(entry: &mut JournalEntry) {
    JOURNAL.with(|journal| {
        let _ = journal.borrow_mut().push(entry);
    });
}

/// Returns the `count` most recent journal entries
pub fn journal_entries(count: u64) -> Vec<JournalEntry> {
    JOURNAL.with(|journal| {
        let binding = journal.borrow();
        let len = binding.len();
        let start = len.saturating_sub(count);
        (start..len).filter_map(|index| binding.get(index)).collect()
    })
}
