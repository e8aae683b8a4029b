use std::borrow::Cow;

use candid::{CandidType, Decode, Encode};
use ic_stable_structures::{storable::Bound, Storable};
use serde::Deserialize;

use crate::{
    state::insert_journal_entry,
    utils::{common::now_seconds, error::ManagerResult},
};

/// Category of a journal entry
#[derive(CandidType, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogType {
    /// Progress note with no lifecycle meaning
    Info,
    /// Outcome of a synchronous claim request
    ClaimResult,
    /// Outcome of a detached fulfillment attempt
    FulfillmentResult,
    /// Housekeeping note, pruned again by the next cleanup
    Cleanup,
}

/// Journal entry
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct JournalEntry {
    pub timestamp: u64,
    pub entry: ManagerResult<()>,
    pub log_type: LogType,
    pub user_id: Option<u64>,
    pub attempt: Option<u8>,
    pub note: Option<String>,
}

/// Builder for journal entries
impl JournalEntry {
    /// Create a new instance of a journal entry
    /// Fills the `timestamp`, `entry`, and `log_type` fields
    pub fn new(entry: ManagerResult<()>, log_type: LogType) -> Self {
        Self {
            timestamp: now_seconds(),
            entry,
            log_type,
            user_id: None,
            attempt: None,
            note: None,
        }
    }

    /// Fills the `user_id` field of the entry
    pub fn user(&mut self, id: u64) -> &mut Self {
        self.user_id = Some(id);
        self
    }

    /// Fills the `attempt` field of the entry
    pub fn attempt(&mut self, attempt: u8) -> &mut Self {
        self.attempt = Some(attempt);
        self
    }

    /// Fills the `note` field of the entry
    pub fn note<S: AsRef<str>>(&mut self, text: S) -> &mut Self {
        self.note = Some(text.as_ref().to_string());
        self
    }

    /// Commits the entry to the stable storage vector
    pub fn commit(&mut self) {
        insert_journal_entry(self);
    }

    /// Whether this entry was produced by the cleanup routine itself.
    /// Such entries are removed again on the next cleanup pass.
    pub fn is_cleanup(&self) -> bool {
        self.log_type == LogType::Cleanup
    }
}

impl Storable for JournalEntry {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(Encode!(self).expect("journal entries are candid encodable"))
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Decode!(bytes.as_ref(), Self).expect("journal entries are candid decodable")
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 500,
        is_fixed_size: false,
    };
}
