//! SQLite-backed run ledger.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use uuid::Uuid;

use crate::db::init_db;
use crate::error::LedgerError;
use crate::types::{Outcome, RunRecord};

const RECORD_COLUMNS: &str =
    "id, job_id, attempt, started_at, finished_at, outcome, error, next_eligible_at";

/// Durable store of [`RunRecord`]s, one row per attempt.
///
/// Thread-safe: all access is serialized through an internal connection lock,
/// which also makes the ledger the single writer for run history. Callers
/// (scheduler loop, CLI queries) never touch the database directly.
pub struct RunLedger {
    conn: Mutex<Connection>,
    retention: usize,
}

impl RunLedger {
    /// Open (or create) the ledger at `path`, keeping at most `retention`
    /// records per job. Retention below 1 would prune in-flight records, so
    /// it is clamped.
    pub fn open(path: impl AsRef<Path>, retention: usize) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            retention: retention.max(1),
        })
    }

    /// Open an in-memory ledger. History does not survive drop; used by tests
    /// and `--dry-run` style tooling.
    pub fn open_in_memory(retention: usize) -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            retention: retention.max(1),
        })
    }

    /// Record the dispatch of a run: inserts a `pending` record.
    ///
    /// Returns [`LedgerError::RunInFlight`] if the job already has a pending
    /// record — the storage-layer guarantee behind the one-run-per-job
    /// invariant.
    pub fn begin_run(
        &self,
        job_id: &str,
        attempt: u32,
        started_at: DateTime<Utc>,
    ) -> Result<RunRecord, LedgerError> {
        let conn = self.conn.lock().unwrap();
        let record = RunRecord {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            attempt,
            started_at,
            finished_at: None,
            outcome: Outcome::Pending,
            error: None,
            next_eligible_at: None,
        };

        let inserted = conn.execute(
            "INSERT INTO run_records (id, job_id, attempt, started_at, outcome)
             VALUES (?1, ?2, ?3, ?4, 'pending')",
            params![record.id, record.job_id, record.attempt, record.started_at],
        );

        match inserted {
            Ok(_) => {
                debug!(job = %job_id, run = %record.id, attempt, "run record opened");
                Ok(record)
            }
            Err(e) if is_constraint_violation(&e) => Err(LedgerError::RunInFlight {
                job_id: job_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Finalize a pending record with a terminal outcome. Updates exactly once:
    /// a record that is already terminal yields [`LedgerError::NotPending`].
    pub fn finish_run(
        &self,
        run_id: &str,
        outcome: Outcome,
        finished_at: DateTime<Utc>,
        error: Option<&str>,
        next_eligible_at: Option<DateTime<Utc>>,
    ) -> Result<(), LedgerError> {
        debug_assert!(outcome.is_terminal(), "finish_run requires a terminal outcome");
        let conn = self.conn.lock().unwrap();

        let updated = conn.execute(
            "UPDATE run_records
             SET outcome = ?1, finished_at = ?2, error = ?3, next_eligible_at = ?4
             WHERE id = ?5 AND outcome = 'pending'",
            params![outcome, finished_at, error, next_eligible_at, run_id],
        )?;
        if updated == 0 {
            return Err(LedgerError::NotPending {
                run_id: run_id.to_string(),
            });
        }

        let job_id: String = conn.query_row(
            "SELECT job_id FROM run_records WHERE id = ?1",
            [run_id],
            |row| row.get(0),
        )?;
        prune_locked(&conn, &job_id, self.retention)?;
        debug!(job = %job_id, run = %run_id, outcome = %outcome, "run record finalized");
        Ok(())
    }

    /// Most recent record for `job_id`, if any.
    pub fn latest_for_job(&self, job_id: &str) -> Result<Option<RunRecord>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM run_records
                     WHERE job_id = ?1
                     ORDER BY started_at DESC, rowid DESC
                     LIMIT 1"
                ),
                [job_id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Up to `limit` most recent records for `job_id`, newest first.
    pub fn recent_for_job(&self, job_id: &str, limit: usize) -> Result<Vec<RunRecord>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM run_records
             WHERE job_id = ?1
             ORDER BY started_at DESC, rowid DESC
             LIMIT ?2"
        ))?;
        let records = stmt
            .query_map(params![job_id, limit as i64], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// The most recent record of every job that has history, ordered by job id.
    pub fn latest_per_job(&self) -> Result<Vec<RunRecord>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM run_records
             WHERE rowid IN (SELECT MAX(rowid) FROM run_records GROUP BY job_id)
             ORDER BY job_id"
        ))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// All records still marked `pending`. After a clean shutdown this is
    /// empty; after a crash it holds the runs that never completed.
    pub fn pending_runs(&self) -> Result<Vec<RunRecord>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM run_records
             WHERE outcome = 'pending'
             ORDER BY job_id"
        ))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

/// Drop everything beyond the newest `retention` records for `job_id`.
fn prune_locked(conn: &Connection, job_id: &str, retention: usize) -> Result<(), LedgerError> {
    let pruned = conn.execute(
        "DELETE FROM run_records
         WHERE job_id = ?1 AND rowid NOT IN (
             SELECT rowid FROM run_records
             WHERE job_id = ?1
             ORDER BY started_at DESC, rowid DESC
             LIMIT ?2
         )",
        params![job_id, retention as i64],
    )?;
    if pruned > 0 {
        debug!(job = %job_id, pruned, "pruned run history");
    }
    Ok(())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        attempt: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        outcome: row.get(5)?,
        error: row.get(6)?,
        next_eligible_at: row.get(7)?,
    })
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(rusqlite::ErrorCode::ConstraintViolation)
    )
}
