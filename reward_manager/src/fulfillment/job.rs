//! Durable fulfillment job records.
//!
//! A job is persisted in the `Pending` state before the buy order goes
//! out, so a fulfillment that dies mid-flight leaves an inspectable
//! record instead of silently stranding the user. The job id doubles as
//! the brokerage idempotency key: retrying an attempt can never produce
//! a second order.

use candid::CandidType;
use serde::Deserialize;

use crate::{
    types::Stock,
    utils::{common::now_seconds, error::ManagerError},
};

/// Lifecycle state of a fulfillment job
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq)]
pub enum FulfillmentStatus {
    /// Opened; the order has not settled yet
    Pending,
    /// Order placed and all state committed
    Settled {
        /// Brokerage order reference
        order_id: String,
        /// Settlement time in epoch seconds
        settled_at: u64,
    },
    /// Gave up; the user keeps their eligibility
    Failed {
        /// The error of the last attempt
        error: ManagerError,
        /// Failure time in epoch seconds
        failed_at: u64,
    },
}

/// One fulfillment of one claim
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq)]
pub struct FulfillmentJob {
    pub id: u64,
    pub user_id: u64,
    /// The stock the allocator selected for this claim
    pub stock: Stock,
    pub status: FulfillmentStatus,
    /// Number of order attempts made so far
    pub attempts: u8,
    pub opened_at: u64,
}

impl FulfillmentJob {
    /// Opens a new job in the `Pending` state
    pub fn open(id: u64, user_id: u64, stock: Stock) -> Self {
        Self {
            id,
            user_id,
            stock,
            status: FulfillmentStatus::Pending,
            attempts: 0,
            opened_at: now_seconds(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == FulfillmentStatus::Pending
    }

    /// Marks the job as settled under the given brokerage order reference
    pub fn settle(&mut self, order_id: String) -> &mut Self {
        self.status = FulfillmentStatus::Settled {
            order_id,
            settled_at: now_seconds(),
        };
        self
    }

    /// Marks the job as terminally failed
    pub fn fail(&mut self, error: ManagerError) -> &mut Self {
        self.status = FulfillmentStatus::Failed {
            error,
            failed_at: now_seconds(),
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock() -> Stock {
        Stock {
            symbol: "AAPL".to_string(),
            price: 5.0,
        }
    }

    #[test]
    fn jobs_open_pending() {
        let job = FulfillmentJob::open(0, 1, stock());
        assert!(job.is_pending());
        assert_eq!(job.attempts, 0);
    }

    #[test]
    fn settling_records_the_order_reference() {
        let mut job = FulfillmentJob::open(0, 1, stock());
        job.settle("order123".to_string());
        assert!(!job.is_pending());
        assert!(matches!(
            job.status,
            FulfillmentStatus::Settled { ref order_id, .. } if order_id == "order123"
        ));
    }

    #[test]
    fn failing_records_the_error() {
        let mut job = FulfillmentJob::open(0, 1, stock());
        job.fail(ManagerError::OrderPlacementFailed("venue down".to_string()));
        assert!(matches!(job.status, FulfillmentStatus::Failed { .. }));
    }
}
