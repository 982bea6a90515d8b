//! Schema initialization.

use rusqlite::Connection;

use crate::error::LedgerError;

/// Initialise the run-history schema in `conn`. Safe to call on every startup
/// (idempotent).
pub fn init_db(conn: &Connection) -> Result<(), LedgerError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS run_records (
            id               TEXT    NOT NULL PRIMARY KEY,
            job_id           TEXT    NOT NULL,
            attempt          INTEGER NOT NULL,
            started_at       TEXT    NOT NULL,   -- RFC 3339
            finished_at      TEXT,               -- NULL while pending
            outcome          TEXT    NOT NULL DEFAULT 'pending',
            error            TEXT,
            next_eligible_at TEXT
        ) STRICT;

        -- Latest-per-job and history queries walk this index backwards.
        CREATE INDEX IF NOT EXISTS idx_run_records_job
            ON run_records (job_id, started_at);

        -- At most one pending run per job, enforced at the storage layer.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_run_records_pending
            ON run_records (job_id) WHERE outcome = 'pending';
        ",
    )?;
    Ok(())
}
