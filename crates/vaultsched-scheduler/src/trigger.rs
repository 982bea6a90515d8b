//! Trigger evaluation: deciding whether a job is due.
//!
//! Pure functions over a job, its last attempted start, and the current time.
//! No side effects; the scheduler loop snapshots the ledger-derived state and
//! asks.

use chrono::{DateTime, Duration, Utc};

use crate::types::{Job, JobSchedule};

/// How far back a never-run cron job looks for a missed tick, in hours.
/// Without history there is no "since last run" anchor, so anything scheduled
/// within this window counts as due.
const CRON_FIRST_RUN_LOOKBACK_HOURS: i64 = 24;

/// Whether `job` should be dispatched at `now`.
///
/// `last_start` is the start of the most recent attempt, successful or not
/// (a pending run means the caller must not even ask — the in-flight check
/// happens before trigger evaluation).
///
/// - Interval jobs: due when `now - last_start >= every`; due immediately on
///   first run ever.
/// - Cron jobs: due when a tick of the expression falls in
///   `(last_start, now]`.
pub fn is_due(job: &Job, last_start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    if !job.enabled {
        return false;
    }

    match &job.schedule {
        JobSchedule::Interval { every } => match last_start {
            None => true,
            Some(last) => {
                let elapsed = now.signed_duration_since(last);
                elapsed >= Duration::from_std(*every).unwrap_or(Duration::MAX)
            }
        },
        JobSchedule::Cron { schedule, .. } => {
            let check_from =
                last_start.unwrap_or(now - Duration::hours(CRON_FIRST_RUN_LOOKBACK_HOURS));
            // Due if the first tick after the anchor has already passed.
            match schedule.after(&check_from).next() {
                Some(next) => next <= now,
                None => false,
            }
        }
    }
}

/// Normalize a 5-field cron expression to the 6-field form the `cron` crate
/// parses by prepending "0 " for seconds. 6-field (or otherwise non-standard)
/// input passes through untouched.
pub fn normalize_cron(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}
