//! Error types for the scheduler core.

use thiserror::Error;

/// Configuration errors. All of these are fatal at startup: the daemon
/// refuses to run with a malformed job set.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read or parse the configuration source.
    #[error("failed to load configuration: {0}")]
    Load(String),

    /// A job id is empty or not unique.
    #[error("invalid job id: {0}")]
    InvalidJobId(String),

    /// Two jobs share the same id.
    #[error("duplicate job id: {0}")]
    DuplicateJobId(String),

    /// A job defines both or neither of `every` and `cron`.
    #[error("job {job_id}: exactly one of `every` or `cron` is required")]
    AmbiguousSchedule { job_id: String },

    /// A duration string could not be parsed.
    #[error("job {job_id}: invalid duration {value:?}")]
    InvalidDuration { job_id: String, value: String },

    /// A cron expression could not be parsed.
    #[error("job {job_id}: invalid cron expression {expression:?}: {reason}")]
    InvalidCron {
        job_id: String,
        expression: String,
        reason: String,
    },

    /// An interval schedule of zero length.
    #[error("job {job_id}: interval must be greater than zero")]
    ZeroInterval { job_id: String },

    /// `max_attempts` must allow at least one attempt.
    #[error("job {job_id}: max_attempts must be at least 1")]
    ZeroAttempts { job_id: String },

    /// An invalid top-level setting (tick interval, backoff bounds, ...).
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Errors that can occur while assembling or driving the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Run-ledger failure.
    #[error(transparent)]
    Ledger(#[from] vaultsched_ledger::LedgerError),

    /// An enabled job has no resolved action.
    #[error("no action registered for job: {0}")]
    MissingAction(String),
}
