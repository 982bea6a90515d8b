//! Run-record types.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

/// Terminal (or in-flight) result of one job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Run has been dispatched and has not completed yet.
    Pending,
    /// The action reported success.
    Success,
    /// The action reported an error.
    Failure,
    /// The action exceeded its deadline and was abandoned.
    Timeout,
}

impl Outcome {
    /// Stable storage form, also used for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Timeout => "timeout",
        }
    }

    /// Whether this outcome ends a run (everything except `Pending`).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Outcome::Pending),
            "success" => Ok(Outcome::Success),
            "failure" => Ok(Outcome::Failure),
            "timeout" => Ok(Outcome::Timeout),
            other => Err(format!("unknown outcome: {other}")),
        }
    }
}

impl ToSql for Outcome {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Outcome {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// One persisted attempt of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// UUID v4 — primary key.
    pub id: String,
    /// Job this run belongs to.
    pub job_id: String,
    /// 1-based position within a retry sequence; resets after success or give-up.
    pub attempt: u32,
    /// When the run was dispatched.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal outcome. `None` while pending.
    pub finished_at: Option<DateTime<Utc>>,
    /// Current outcome.
    pub outcome: Outcome,
    /// Failure/timeout reason, if any.
    pub error: Option<String>,
    /// Earliest instant backoff permits the next attempt, if a retry is scheduled.
    pub next_eligible_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_roundtrips_through_str() {
        for outcome in [
            Outcome::Pending,
            Outcome::Success,
            Outcome::Failure,
            Outcome::Timeout,
        ] {
            let parsed: Outcome = outcome.as_str().parse().unwrap();
            assert_eq!(parsed, outcome);
        }
    }

    #[test]
    fn unknown_outcome_is_rejected() {
        assert!("aborted".parse::<Outcome>().is_err());
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!Outcome::Pending.is_terminal());
        assert!(Outcome::Success.is_terminal());
        assert!(Outcome::Failure.is_terminal());
        assert!(Outcome::Timeout.is_terminal());
    }
}
