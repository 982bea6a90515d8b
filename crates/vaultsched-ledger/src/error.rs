//! Error types for the run ledger.

use thiserror::Error;

/// Errors that can occur in ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Underlying SQLite / rusqlite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A pending run already exists for this job.
    #[error("run already in flight for job: {job_id}")]
    RunInFlight { job_id: String },

    /// The record is not pending, so it cannot be finalized (again).
    #[error("run record is not pending: {run_id}")]
    NotPending { run_id: String },
}
