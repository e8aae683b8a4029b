//! Cleanup functionality for managing system state.
//!
//! This module provides the periodic cleanup operations:
//! - Journal log management and pruning
//! - Catalog and price cache expiry
//! - Master RNG reseeding from the IC randomness tape
//!
//! The cleanup keeps the stable journal bounded and makes sure the band
//! and asset draws never keep running on one stale seed.

use ic_exports::ic_cdk::api::management_canister::main::raw_rand;

use crate::constants::MAX_JOURNAL_ENTRIES;
use crate::journal::{JournalEntry, LogType};
use crate::state::{self, JOURNAL};
use crate::utils::common::extract_call_result;
use crate::utils::error::{ManagerError, ManagerResult};

/// Performs the daily cleanup tasks: journal pruning, cache expiry, and
/// RNG reseeding, logging the outcome of each.
pub async fn daily_cleanup() {
    journal_cleanup();
    state::prune_caches();

    JournalEntry::new(Ok(()), LogType::Cleanup)
        .note("Cleaned up the journal and dropped the expired cache entries.")
        .commit();

    match reseed_master_rng().await {
        Ok(()) => JournalEntry::new(Ok(()), LogType::Cleanup)
            .note("Reseeded the master RNG from the IC randomness tape.")
            .commit(),
        Err(err) => JournalEntry::new(Err(err), LogType::Cleanup)
            .note("Failed to reseed the master RNG.")
            .commit(),
    };

    JournalEntry::new(Ok(()), LogType::Cleanup)
        .note("Finished the cleanup successfully.")
        .commit();
}

/// Replaces the master RNG with one seeded from `raw_rand`.
///
/// # Errors
/// - Propagates the inter-canister call failure
/// - Returns `ManagerError::Custom` if the tape is not 32 bytes long
pub async fn reseed_master_rng() -> ManagerResult<()> {
    let call_result = raw_rand().await;

    let seed: Vec<u8> = extract_call_result(call_result)?;

    // Ensure the seed is exactly 32 bytes
    let seed_array: [u8; 32] = seed.try_into().map_err(|_| {
        ManagerError::Custom(
            "Couldn't convert the seed bytes into a fixed length slice.".to_string(),
        )
    })?;

    state::seed_rng(seed_array);
    Ok(())
}

/// Manages the cleanup of the system journal logs.
///
/// Two passes: previous cleanup notes are dropped entirely, then the
/// journal is trimmed to the most recent `MAX_JOURNAL_ENTRIES` entries.
pub fn journal_cleanup() {
    JOURNAL.with(|journal| {
        let mut binding = journal.borrow_mut();

        // Initialize a new stable vector safely and return if initialization fails
        let temp = if let Ok(vec) =
            ic_stable_structures::Vec::init(ic_stable_structures::DefaultMemoryImpl::default())
        {
            vec
        } else {
            return; // Exit if initialization fails
        };

        for entry in binding.iter() {
            if !entry.is_cleanup() {
                let _ = temp.push(&entry);
            }
        }

        *binding = temp;
    });

    JOURNAL.with(|journal| {
        let binding = journal.borrow_mut();

        let len = binding.len();
        if len > MAX_JOURNAL_ENTRIES {
            let excess = len - MAX_JOURNAL_ENTRIES;

            // Shift all items to remove the oldest ones
            for index in excess..len {
                if let Some(item) = binding.get(index) {
                    binding.set(index - excess, &item);
                }
            }

            // Pop the remaining items to resize the vector
            for _ in 0..excess {
                binding.pop();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::journal_entries;

    #[test]
    fn cleanup_notes_are_dropped_on_the_next_pass() {
        JournalEntry::new(Ok(()), LogType::Info).note("keep me").commit();
        JournalEntry::new(Ok(()), LogType::Cleanup)
            .note("drop me")
            .commit();

        journal_cleanup();

        let entries = journal_entries(10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].note.as_deref(), Some("keep me"));
    }

    #[test]
    fn the_journal_is_trimmed_to_its_cap() {
        for index in 0..(MAX_JOURNAL_ENTRIES + 50) {
            JournalEntry::new(Ok(()), LogType::Info)
                .note(format!("entry {index}"))
                .commit();
        }

        journal_cleanup();

        let entries = journal_entries(MAX_JOURNAL_ENTRIES + 50);
        assert_eq!(entries.len() as u64, MAX_JOURNAL_ENTRIES);
        // The oldest entries are the ones that went away.
        assert_eq!(entries[0].note.as_deref(), Some("entry 50"));
    }
}
