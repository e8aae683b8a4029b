//! Claim Locking System
//!
//! A timeout-based locking mechanism that prevents overlapping claims for
//! the same user while providing automatic deadlock recovery: a
//! fulfillment that dies mid-flight releases its user after the timeout
//! instead of stranding them behind a held lock.
//!
//! ```plain
//! Lock State Machine:
//!
//!                   ┌──────────┐
//!              ┌────► Unlocked │◄─────┐
//!              │    └──────────┘      │
//!              │         │            │
//! Auto-Unlock  │     try_lock       unlock
//! (Timeout)    │         │            │
//!              │         ▼            │
//!              │    ┌─────────┐       │
//!              └────┤ Locked  ├───────┘
//!                   └─────────┘
//!
//! Timeout = claim_lock_timeout() (3600s)
//! ```

use crate::{
    constants::claim_lock_timeout,
    utils::{
        common::now_seconds,
        error::{ManagerError, ManagerResult},
    },
};

/// Per-user claim lock with automatic timeout recovery.
#[derive(Clone, Default)]
pub struct ClaimLock {
    /// Current lock state
    pub is_locked: bool,
    /// Last successful lock acquisition time
    pub last_locked_at: Option<u64>,
}

impl ClaimLock {
    /// Attempts to acquire the lock with timeout validation.
    ///
    /// Succeeds if either:
    /// 1. Lock is currently free (unlocked)
    /// 2. Existing lock has exceeded the timeout period
    ///
    /// # Returns
    /// * `Ok(())` - Lock successfully acquired
    /// * `Err(ManagerError::ClaimInProgress)` - Lock unavailable
    pub fn try_lock(&mut self) -> ManagerResult<()> {
        let current_time = now_seconds();

        if let Some(last_locked_at) = self.last_locked_at {
            if self.is_locked && current_time - last_locked_at > claim_lock_timeout() {
                self.is_locked = false;
            }
        }

        if !self.is_locked {
            self.is_locked = true;
            self.last_locked_at = Some(current_time);
            Ok(())
        } else {
            Err(ManagerError::ClaimInProgress)
        }
    }

    /// Releases the lock.
    pub fn unlock(&mut self) {
        self.is_locked = false;
        self.last_locked_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::common::test_clock;

    #[test]
    fn a_held_lock_rejects_a_second_claim() {
        let mut lock = ClaimLock::default();
        assert!(lock.try_lock().is_ok());
        assert_eq!(lock.try_lock(), Err(ManagerError::ClaimInProgress));
    }

    #[test]
    fn unlock_makes_the_lock_reacquirable() {
        let mut lock = ClaimLock::default();
        lock.try_lock().unwrap();
        lock.unlock();
        assert!(lock.try_lock().is_ok());
    }

    #[test]
    fn an_abandoned_lock_recovers_after_the_timeout() {
        test_clock::set(1_700_000_000);
        let mut lock = ClaimLock::default();
        lock.try_lock().unwrap();

        test_clock::advance(claim_lock_timeout());
        assert_eq!(lock.try_lock(), Err(ManagerError::ClaimInProgress));

        test_clock::advance(1);
        assert!(lock.try_lock().is_ok());
    }
}
