//! Scheduler core for vaultsched.
//!
//! This crate provides the control plane of the daemon:
//! - validated job definitions loaded once at startup ([`JobRegistry`]),
//! - pure dueness evaluation over interval and cron schedules,
//! - bounded execution of external actions ([`Executor`]),
//! - exponential retry backoff with give-up ([`RetryPolicy`]),
//! - the tick-driven [`Scheduler`] loop that ties them to the run ledger.
//!
//! Actions themselves live behind the [`JobAction`] seam; this crate never
//! learns what a job actually does.

mod config;
mod error;
mod executor;
mod registry;
mod retry;
mod scheduler;
mod trigger;
mod types;

pub use config::{ActionRef, Config, JobSpec, VaultConfig, parse_duration};
pub use error::{ConfigError, SchedulerError};
pub use executor::{ActionOutcome, Executor, JobAction};
pub use registry::JobRegistry;
pub use retry::{Disposition, RetryPolicy};
pub use scheduler::{Scheduler, SchedulerSettings};
pub use trigger::is_due;
pub use types::{Job, JobSchedule, JobState, RunPhase};
