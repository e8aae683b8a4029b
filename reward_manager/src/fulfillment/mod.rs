//! # Fulfillment
//!
//! The detached half of a claim. A claim request ends with a `Pending`
//! job record and a held per-user lock. Everything after that (placing
//! the buy order, committing the user transition, crediting the ledger)
//! happens here, off the request path.

pub mod job;
pub mod lock;
pub mod run;
