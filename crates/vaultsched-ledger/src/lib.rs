//! Durable run-history ledger for vaultsched.
//!
//! This crate owns RunRecord storage. It is the single writer:
//! - records a `pending` row when a run is dispatched,
//! - finalizes that row exactly once on completion,
//! - enforces at most one pending run per job (partial unique index),
//! - survives restarts (embedded SQLite file) and exposes the dangling
//!   `pending` rows a crash leaves behind so the scheduler can recover them.

mod db;
mod error;
mod ledger;
mod types;

pub use error::LedgerError;
pub use ledger::RunLedger;
pub use types::{Outcome, RunRecord};
