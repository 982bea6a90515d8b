//! Read-only commands: `validate`, `jobs`, and `history`.

use std::path::Path;

use chrono::{DateTime, Utc};
use miette::Result;

use vaultsched_ledger::{Outcome, RunLedger, RunRecord};
use vaultsched_scheduler::{Config, JobRegistry, is_due};

/// Validate the configuration; exits non-zero through the error path when a
/// job definition is rejected.
pub fn validate(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path).map_err(|e| miette::miette!("{}", e))?;
    let registry = JobRegistry::from_config(&config).map_err(|e| miette::miette!("{}", e))?;
    vaultsched_scheduler::SchedulerSettings::from_config(&config)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "configuration ok: {} job(s), ledger at {}",
        registry.len(),
        config.db_path.display()
    );
    Ok(())
}

/// List configured jobs with their last recorded outcome and dueness.
pub fn jobs(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path).map_err(|e| miette::miette!("{}", e))?;
    let registry = JobRegistry::from_config(&config).map_err(|e| miette::miette!("{}", e))?;
    let ledger = RunLedger::open(&config.db_path, config.history_per_job)
        .map_err(|e| miette::miette!("{}", e))?;

    let now = Utc::now();
    println!(
        "{:<24} {:<20} {:<8} {:<10} {:<22} DUE",
        "JOB", "SCHEDULE", "ENABLED", "LAST", "STARTED"
    );
    for job in registry.iter() {
        let latest = ledger
            .latest_for_job(&job.id)
            .map_err(|e| miette::miette!("{}", e))?;

        let (last_outcome, last_started) = match &latest {
            Some(record) => (record.outcome.to_string(), format_time(Some(record.started_at))),
            None => ("-".to_string(), "-".to_string()),
        };
        // A dangling pending record means in flight (or a crash the daemon
        // has not recovered yet); either way the job is not due.
        let due = match &latest {
            Some(record) if record.outcome == Outcome::Pending => false,
            latest => is_due(job, latest.as_ref().map(|r| r.started_at), now),
        };

        println!(
            "{:<24} {:<20} {:<8} {:<10} {:<22} {}",
            job.id,
            job.schedule.to_string(),
            job.enabled,
            last_outcome,
            last_started,
            if due { "yes" } else { "no" },
        );
    }
    Ok(())
}

/// Print run history, newest first, for one job or the latest record of each.
pub fn history(config_path: &Path, job: Option<&str>, limit: usize) -> Result<()> {
    let config = Config::load(config_path).map_err(|e| miette::miette!("{}", e))?;
    let ledger = RunLedger::open(&config.db_path, config.history_per_job)
        .map_err(|e| miette::miette!("{}", e))?;

    let records = match job {
        Some(job_id) => ledger
            .recent_for_job(job_id, limit)
            .map_err(|e| miette::miette!("{}", e))?,
        None => ledger
            .latest_per_job()
            .map_err(|e| miette::miette!("{}", e))?,
    };

    if records.is_empty() {
        println!("no run history");
        return Ok(());
    }

    println!(
        "{:<24} {:<8} {:<8} {:<22} {:<22} ERROR",
        "JOB", "ATTEMPT", "OUTCOME", "STARTED", "FINISHED"
    );
    for record in records {
        print_record(&record);
    }
    Ok(())
}

fn print_record(record: &RunRecord) {
    println!(
        "{:<24} {:<8} {:<8} {:<22} {:<22} {}",
        record.job_id,
        record.attempt,
        record.outcome.to_string(),
        format_time(Some(record.started_at)),
        format_time(record.finished_at),
        record.error.as_deref().unwrap_or("-"),
    );
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}
