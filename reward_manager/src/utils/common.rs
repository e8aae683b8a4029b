//! Common utility and helper functions that are used across the project

use candid::Principal;
use chrono::Duration;
use ic_exports::ic_cdk::api::{call::CallResult, is_controller};

use super::error::*;

/// Returns Err if the `caller` is not a controller of the canister
pub fn only_controller(caller: Principal) -> ManagerResult<()> {
    if !is_controller(&caller) {
        // only the controller should be able to call this function
        return Err(ManagerError::Unauthorized);
    }
    Ok(())
}

/// Extracts the Ok or Err values of a canister call and returns them.
pub fn extract_call_result<T>(result: CallResult<(T,)>) -> ManagerResult<T> {
    result
        .map(|(success_value,)| success_value)
        .map_err(|(rejection_code, error_message)| {
            ManagerError::CallResult(rejection_code, error_message)
        })
}

/// Current IC time denominated in seconds.
pub fn now_seconds() -> u64 {
    #[cfg(not(test))]
    {
        ic_exports::ic_cdk::api::time() / 1_000_000_000
    }
    #[cfg(test)]
    {
        test_clock::get()
    }
}

/// Check if a given timestamp (seconds) is older than the given number of days
pub fn is_older_than(timestamp: u64, days: u64) -> bool {
    if timestamp == 0 {
        return false;
    }

    let threshold = now_seconds().saturating_sub(Duration::days(days as i64).num_seconds() as u64);

    timestamp < threshold
}

/// Manually driven clock backing `now_seconds` in unit tests, where the IC
/// system time API is unavailable.
#[cfg(test)]
pub mod test_clock {
    use std::cell::Cell;

    thread_local! {
        static NOW: Cell<u64> = Cell::new(1_700_000_000);
    }

    pub fn get() -> u64 {
        NOW.with(|now| now.get())
    }

    pub fn set(timestamp: u64) {
        NOW.with(|now| now.set(timestamp));
    }

    pub fn advance(seconds: u64) {
        NOW.with(|now| now.set(now.get() + seconds));
    }
}
