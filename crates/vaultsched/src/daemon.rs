//! Daemon command: wire the configuration, ledger, actions, and scheduler
//! together and run until a termination signal.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use miette::Result;
use tokio::sync::watch;
use tracing::info;

use vaultsched_actions::ActionResolver;
use vaultsched_ledger::RunLedger;
use vaultsched_scheduler::{
    Config, JobAction, JobRegistry, Scheduler, SchedulerSettings,
};

/// Run the daemon.
pub async fn run(config_path: &Path, once: bool, dry_run: bool) -> Result<()> {
    info!(config = %config_path.display(), "starting vaultsched daemon");

    let config = Config::load(config_path).map_err(|e| miette::miette!("{}", e))?;

    // A malformed job set is fatal: refuse to start rather than run a
    // partial schedule.
    let registry = JobRegistry::from_config(&config).map_err(|e| miette::miette!("{}", e))?;
    let settings = SchedulerSettings::from_config(&config).map_err(|e| miette::miette!("{}", e))?;

    if registry.is_empty() {
        info!("no jobs configured; the daemon will idle");
    }

    // Resolve every enabled job's action once, up front.
    let resolver = ActionResolver::new(config.vault.as_ref());
    let mut actions: HashMap<String, Arc<dyn JobAction>> = HashMap::new();
    for job in registry.iter().filter(|j| j.enabled) {
        let action = resolver
            .resolve(&job.action)
            .map_err(|e| miette::miette!("job {}: {}", job.id, e))?;
        actions.insert(job.id.clone(), action);
    }

    let ledger = Arc::new(
        RunLedger::open(&config.db_path, config.history_per_job)
            .map_err(|e| miette::miette!("failed to open run ledger: {}", e))?,
    );

    let mut scheduler = Scheduler::new(registry, actions, Arc::clone(&ledger), settings)
        .map_err(|e| miette::miette!("{}", e))?;

    if dry_run {
        // Evaluation only: seed state from history but record nothing.
        scheduler
            .seed_from_ledger()
            .map_err(|e| miette::miette!("{}", e))?;
        let due = scheduler.due_now(Utc::now());
        info!(due = due.len(), "dry run: evaluation only");
        for job in due {
            info!(job = %job.id, schedule = %job.schedule, action = job.action.kind(), "would run");
        }
        return Ok(());
    }

    let recovered = scheduler
        .recover(Utc::now())
        .map_err(|e| miette::miette!("{}", e))?;
    if recovered > 0 {
        info!(recovered, "recovered interrupted runs from previous process");
    }

    if once {
        info!("single evaluation pass requested");
        scheduler.run_once().await;
        return Ok(());
    }

    // Create shutdown channel and handle termination signals
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    scheduler.run(shutdown_rx).await;
    info!("daemon shut down gracefully");
    Ok(())
}
