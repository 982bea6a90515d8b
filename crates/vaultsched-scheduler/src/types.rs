//! Job and per-job state types.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::ActionRef;

/// A validated, named recurring unit of work.
///
/// Instances are produced by [`JobRegistry`](crate::JobRegistry) from raw
/// configuration; construction elsewhere skips validation and is reserved
/// for tests.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique stable identifier.
    pub id: String,
    /// When the job should run.
    pub schedule: JobSchedule,
    /// Reference to the external operation this job performs.
    pub action: ActionRef,
    /// Hard deadline for a single run.
    pub timeout: Duration,
    /// Consecutive attempts before the cycle is given up.
    pub max_attempts: u32,
    /// Disabled jobs are kept in the registry (history stays queryable) but
    /// never trigger.
    pub enabled: bool,
}

/// When/how often a job runs. The two forms are mutually exclusive by
/// construction.
#[derive(Debug, Clone)]
pub enum JobSchedule {
    /// Run every `every`, measured from the last attempted start.
    Interval { every: Duration },
    /// Run when the cron expression ticks. `expression` keeps the normalized
    /// 6-field source for display and logging.
    Cron {
        schedule: cron::Schedule,
        expression: String,
    },
}

impl std::fmt::Display for JobSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobSchedule::Interval { every } => write!(f, "every {}s", every.as_secs()),
            JobSchedule::Cron { expression, .. } => write!(f, "cron {expression}"),
        }
    }
}

/// Where a job currently is in its run lifecycle.
///
/// `IDLE -> (due) -> RUNNING -> {success, failure, timeout}
///   -> RETRY_WAIT -> (backoff elapsed) -> RUNNING | IDLE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    /// Waiting for the schedule to come due.
    Idle,
    /// A failed attempt is waiting out its backoff delay.
    RetryWait { at: DateTime<Utc> },
    /// An attempt is in flight.
    Running { run_id: String, attempt: u32 },
}

/// In-memory scheduling state for one job. Derived state only: it is
/// reconstructed from the run ledger on startup and never persisted itself.
#[derive(Debug, Clone)]
pub struct JobState {
    pub phase: RunPhase,
    /// Consecutive failed attempts in the current retry cycle.
    pub failures: u32,
    /// Start of the most recent attempt, successful or not.
    pub last_started: Option<DateTime<Utc>>,
}

impl JobState {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
            failures: 0,
            last_started: None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, RunPhase::Running { .. })
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Minimal interval job for unit tests.
    pub fn interval_job(id: &str, every_secs: u64) -> Job {
        Job {
            id: id.to_string(),
            schedule: JobSchedule::Interval {
                every: Duration::from_secs(every_secs),
            },
            action: ActionRef::Command {
                program: "true".to_string(),
                args: vec![],
            },
            timeout: Duration::from_secs(60),
            max_attempts: 3,
            enabled: true,
        }
    }

    pub fn cron_job(id: &str, expression: &str) -> Job {
        use std::str::FromStr;
        let normalized = crate::trigger::normalize_cron(expression);
        Job {
            id: id.to_string(),
            schedule: JobSchedule::Cron {
                schedule: cron::Schedule::from_str(&normalized).unwrap(),
                expression: normalized,
            },
            action: ActionRef::Command {
                program: "true".to_string(),
                args: vec![],
            },
            timeout: Duration::from_secs(60),
            max_attempts: 3,
            enabled: true,
        }
    }
}
