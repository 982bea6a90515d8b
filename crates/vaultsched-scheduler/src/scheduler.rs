//! The scheduler control loop.
//!
//! A single loop drives all triggering decisions: it wakes on a fixed tick,
//! asks the trigger evaluator which jobs are due, and dispatches each as its
//! own tokio task so a slow or hung action never delays another job's
//! evaluation. Completions come back over an mpsc channel owned by the loop;
//! all ledger writes happen here, on the loop, which keeps outcome processing
//! for any one job strictly sequential.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use vaultsched_ledger::{LedgerError, Outcome, RunLedger};

use crate::config::{Config, parse_duration};
use crate::error::{ConfigError, SchedulerError};
use crate::executor::{ActionOutcome, Executor, JobAction};
use crate::registry::JobRegistry;
use crate::retry::{Disposition, RetryPolicy};
use crate::trigger::is_due;
use crate::types::{Job, JobState, RunPhase};

/// Runtime knobs for the loop, parsed out of [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    /// Control-loop wakeup cadence.
    pub tick_interval: Duration,
    /// How long in-flight runs may finish after a stop request.
    pub shutdown_grace: Duration,
    /// First retry delay.
    pub backoff_base: Duration,
    /// Retry delay ceiling.
    pub backoff_cap: Duration,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let tick_interval = parse_setting("tick_interval", &config.tick_interval)?;
        if tick_interval < Duration::from_secs(1) {
            return Err(ConfigError::InvalidSetting {
                name: "tick_interval",
                reason: "must be at least 1s".to_string(),
            });
        }
        let shutdown_grace = parse_setting("shutdown_grace", &config.shutdown_grace)?;
        let backoff_base = parse_setting("backoff_base", &config.backoff_base)?;
        if backoff_base.is_zero() {
            return Err(ConfigError::InvalidSetting {
                name: "backoff_base",
                reason: "must be greater than zero".to_string(),
            });
        }
        let backoff_cap = parse_setting("backoff_cap", &config.backoff_cap)?;
        if backoff_cap < backoff_base {
            return Err(ConfigError::InvalidSetting {
                name: "backoff_cap",
                reason: "must be at least backoff_base".to_string(),
            });
        }
        Ok(Self {
            tick_interval,
            shutdown_grace,
            backoff_base,
            backoff_cap,
        })
    }
}

fn parse_setting(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).ok_or_else(|| ConfigError::InvalidSetting {
        name,
        reason: format!("invalid duration {value:?}"),
    })
}

/// Completion message sent back from a dispatched run task.
struct RunCompletion {
    job_id: String,
    run_id: String,
    attempt: u32,
    result: ActionOutcome,
    finished_at: DateTime<Utc>,
}

/// A completed run whose ledger write failed; retried on later ticks so a
/// transient storage error never corrupts in-memory scheduling state.
struct DeferredWrite {
    run_id: String,
    outcome: Outcome,
    finished_at: DateTime<Utc>,
    error: Option<String>,
    next_eligible_at: Option<DateTime<Utc>>,
}

/// The coordinating control loop.
pub struct Scheduler {
    registry: JobRegistry,
    actions: HashMap<String, Arc<dyn JobAction>>,
    ledger: Arc<RunLedger>,
    policy: RetryPolicy,
    settings: SchedulerSettings,
    states: HashMap<String, JobState>,
    deferred: Vec<DeferredWrite>,
}

impl Scheduler {
    /// Assemble the loop. Every enabled job must have a resolved action in
    /// `actions` — a missing one is a wiring bug surfaced at startup, not at
    /// dispatch time.
    pub fn new(
        registry: JobRegistry,
        actions: HashMap<String, Arc<dyn JobAction>>,
        ledger: Arc<RunLedger>,
        settings: SchedulerSettings,
    ) -> Result<Self, SchedulerError> {
        for job in registry.iter() {
            if job.enabled && !actions.contains_key(&job.id) {
                return Err(SchedulerError::MissingAction(job.id.clone()));
            }
        }

        let states = registry
            .iter()
            .map(|job| (job.id.clone(), JobState::new()))
            .collect();

        Ok(Self {
            registry,
            actions,
            ledger,
            policy: RetryPolicy::new(settings.backoff_base, settings.backoff_cap),
            settings,
            states,
            deferred: Vec::new(),
        })
    }

    /// Seed in-memory state from the ledger without writing anything.
    ///
    /// `last_started` keeps interval jobs from re-firing immediately after
    /// every restart; a still-pending record keeps its job out of dispatch.
    /// Evaluation-only paths (`--dry-run`) stop here; the daemon proper
    /// continues with [`recover`](Scheduler::recover).
    pub fn seed_from_ledger(&mut self) -> Result<(), SchedulerError> {
        for record in self.ledger.latest_per_job()? {
            if let Some(state) = self.states.get_mut(&record.job_id) {
                state.last_started = Some(record.started_at);
                if record.outcome == Outcome::Pending {
                    state.phase = RunPhase::Running {
                        run_id: record.id.clone(),
                        attempt: record.attempt,
                    };
                }
            }
        }
        Ok(())
    }

    /// Rebuild in-memory state from the ledger and settle anything a crash
    /// left behind.
    ///
    /// Dangling `pending` records are an unknown outcome: they are finalized
    /// as `failure("interrupted")` and the job is scheduled for retry under
    /// the standard policy — never silently assumed successful. Returns the
    /// number of records recovered.
    pub fn recover(&mut self, now: DateTime<Utc>) -> Result<usize, SchedulerError> {
        self.seed_from_ledger()?;

        let pending = self.ledger.pending_runs()?;
        let mut recovered = 0;
        for record in pending {
            let disposition = self
                .registry
                .get(&record.job_id)
                .filter(|job| job.enabled)
                .map(|job| self.policy.next_attempt(job, record.attempt, now));

            let next_eligible = match disposition {
                Some(Disposition::RetryAt(at)) => Some(at),
                _ => None,
            };

            self.ledger.finish_run(
                &record.id,
                Outcome::Failure,
                now,
                Some("interrupted"),
                next_eligible,
            )?;
            recovered += 1;

            match self.states.get_mut(&record.job_id) {
                Some(state) => {
                    state.last_started = Some(record.started_at);
                    match next_eligible {
                        Some(at) => {
                            state.failures = record.attempt;
                            state.phase = RunPhase::RetryWait { at };
                            warn!(
                                job = %record.job_id,
                                attempt = record.attempt,
                                retry_at = %at,
                                "recovered interrupted run, retry scheduled"
                            );
                        }
                        None => {
                            state.failures = 0;
                            state.phase = RunPhase::Idle;
                            warn!(
                                job = %record.job_id,
                                attempt = record.attempt,
                                "recovered interrupted run, waiting for next regular trigger"
                            );
                        }
                    }
                }
                None => {
                    warn!(job = %record.job_id, "interrupted run belongs to a job no longer configured");
                }
            }
        }

        Ok(recovered)
    }

    /// Drive the loop until `shutdown_rx` flips to `true`, then drain
    /// in-flight runs for up to the shutdown grace period.
    pub async fn run(&mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            jobs = self.registry.len(),
            tick = ?self.settings.tick_interval,
            "scheduler starting"
        );

        let (tx, mut rx) = mpsc::channel::<RunCompletion>(self.registry.len().max(1));
        let mut tick = tokio::time::interval(self.settings.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }

                Some(done) = rx.recv() => {
                    self.on_completion(done);
                }

                _ = tick.tick() => {
                    self.flush_deferred();
                    self.dispatch_due(Utc::now(), &tx);
                }
            }
        }

        // No new dispatches past this point; give in-flight runs their grace.
        let in_flight = self.running_count();
        if in_flight > 0 {
            info!(in_flight, "stop requested, draining in-flight runs");
        }
        self.drain(&mut rx).await;
        self.flush_deferred();
        info!("scheduler shut down gracefully");
    }

    /// Execute one evaluation pass: dispatch everything currently due, wait
    /// for those runs to complete, and return. Used by `--once`.
    pub async fn run_once(&mut self) {
        let (tx, mut rx) = mpsc::channel::<RunCompletion>(self.registry.len().max(1));
        self.dispatch_due(Utc::now(), &tx);
        drop(tx);

        while let Some(done) = rx.recv().await {
            self.on_completion(done);
        }
        self.flush_deferred();
    }

    /// Jobs that would be dispatched at `now`. Read-only; used by `--dry-run`
    /// and the `jobs` listing.
    pub fn due_now(&self, now: DateTime<Utc>) -> Vec<&Job> {
        self.registry
            .iter()
            .filter(|job| self.job_due(job, now))
            .collect()
    }

    fn job_due(&self, job: &Job, now: DateTime<Utc>) -> bool {
        let Some(state) = self.states.get(&job.id) else {
            return false;
        };
        match state.phase {
            RunPhase::Running { .. } => false,
            RunPhase::RetryWait { at } => job.enabled && now >= at,
            RunPhase::Idle => is_due(job, state.last_started, now),
        }
    }

    fn dispatch_due(&mut self, now: DateTime<Utc>, tx: &mpsc::Sender<RunCompletion>) {
        let due: Vec<Job> = self
            .registry
            .iter()
            .filter(|job| self.job_due(job, now))
            .cloned()
            .collect();

        for job in due {
            self.dispatch(job, now, tx);
        }
    }

    fn dispatch(&mut self, job: Job, now: DateTime<Utc>, tx: &mpsc::Sender<RunCompletion>) {
        let Some(action) = self.actions.get(&job.id).map(Arc::clone) else {
            // new() checked this; only reachable if a job was disabled in
            // config but became due anyway.
            error!(job = %job.id, "no action resolved for job, skipping dispatch");
            return;
        };

        let attempt = self
            .states
            .get(&job.id)
            .map(|s| s.failures + 1)
            .unwrap_or(1);

        let record = match self.ledger.begin_run(&job.id, attempt, now) {
            Ok(record) => record,
            Err(LedgerError::RunInFlight { .. }) => {
                // The in-memory phase said idle but the ledger disagrees;
                // trust the ledger and skip.
                warn!(job = %job.id, "ledger reports a run already in flight, skipping dispatch");
                return;
            }
            Err(e) => {
                // Transient storage trouble: skip this dispatch, the job
                // stays eligible and is retried next tick.
                error!(job = %job.id, error = %e, "could not open run record, skipping dispatch");
                return;
            }
        };

        if let Some(state) = self.states.get_mut(&job.id) {
            state.phase = RunPhase::Running {
                run_id: record.id.clone(),
                attempt,
            };
            state.last_started = Some(now);
        }

        info!(job = %job.id, attempt, run = %record.id, action = job.action.kind(), "dispatching job");

        let tx = tx.clone();
        let timeout = job.timeout;
        let job_id = job.id.clone();
        tokio::spawn(async move {
            let result = Executor::execute(action, timeout).await;
            let completion = RunCompletion {
                job_id,
                run_id: record.id,
                attempt,
                result,
                finished_at: Utc::now(),
            };
            // The loop owns the receiver for its whole lifetime; a send error
            // only happens during teardown.
            let _ = tx.send(completion).await;
        });
    }

    fn on_completion(&mut self, done: RunCompletion) {
        let Some(job) = self.registry.get(&done.job_id).cloned() else {
            warn!(job = %done.job_id, "completion for unknown job");
            return;
        };

        let disposition = if done.result.is_success() {
            None
        } else {
            Some(self.policy.next_attempt(&job, done.attempt, done.finished_at))
        };
        let next_eligible = match &disposition {
            Some(Disposition::RetryAt(at)) => Some(*at),
            _ => None,
        };

        if let Err(e) = self.ledger.finish_run(
            &done.run_id,
            done.result.outcome(),
            done.finished_at,
            done.result.reason(),
            next_eligible,
        ) {
            match e {
                LedgerError::NotPending { .. } => {
                    warn!(job = %done.job_id, run = %done.run_id, "run record was already finalized");
                }
                e => {
                    error!(job = %done.job_id, run = %done.run_id, error = %e, "ledger write failed, deferring");
                    self.deferred.push(DeferredWrite {
                        run_id: done.run_id.clone(),
                        outcome: done.result.outcome(),
                        finished_at: done.finished_at,
                        error: done.result.reason().map(String::from),
                        next_eligible_at: next_eligible,
                    });
                }
            }
        }

        let Some(state) = self.states.get_mut(&done.job_id) else {
            return;
        };

        match &done.result {
            ActionOutcome::Success => {
                state.failures = 0;
                state.phase = RunPhase::Idle;
                info!(job = %done.job_id, attempt = done.attempt, "run succeeded");
            }
            result => match disposition {
                Some(Disposition::RetryAt(at)) => {
                    state.failures = done.attempt;
                    state.phase = RunPhase::RetryWait { at };
                    warn!(
                        job = %done.job_id,
                        attempt = done.attempt,
                        outcome = %result.outcome(),
                        reason = result.reason().unwrap_or(""),
                        retry_at = %at,
                        "run failed, retry scheduled"
                    );
                }
                // Spent cycle: back to normal scheduling, not disabled.
                Some(Disposition::GiveUp) | None => {
                    state.failures = 0;
                    state.phase = RunPhase::Idle;
                    error!(
                        job = %done.job_id,
                        attempts = done.attempt,
                        outcome = %result.outcome(),
                        reason = result.reason().unwrap_or(""),
                        "run failed, giving up until next regular trigger"
                    );
                }
            },
        }
    }

    fn flush_deferred(&mut self) {
        if self.deferred.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.deferred);
        for write in pending {
            match self.ledger.finish_run(
                &write.run_id,
                write.outcome.clone(),
                write.finished_at,
                write.error.as_deref(),
                write.next_eligible_at,
            ) {
                Ok(()) => {
                    debug!(run = %write.run_id, "deferred ledger write settled");
                }
                Err(LedgerError::NotPending { .. }) => {}
                Err(e) => {
                    warn!(run = %write.run_id, error = %e, "deferred ledger write still failing");
                    self.deferred.push(write);
                }
            }
        }
    }

    async fn drain(&mut self, rx: &mut mpsc::Receiver<RunCompletion>) {
        let deadline = tokio::time::Instant::now() + self.settings.shutdown_grace;
        while self.running_count() > 0 {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(done)) => self.on_completion(done),
                Ok(None) => break,
                Err(_) => {
                    // Abandoned runs keep their pending records; the next
                    // startup recovers them as interrupted.
                    warn!(
                        in_flight = self.running_count(),
                        "shutdown grace elapsed, abandoning in-flight runs"
                    );
                    break;
                }
            }
        }
    }

    fn running_count(&self) -> usize {
        self.states.values().filter(|s| s.is_running()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::interval_job;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct Noop;

    #[async_trait]
    impl JobAction for Noop {
        async fn invoke(&self) -> Result<(), String> {
            Ok(())
        }
    }

    fn settings() -> SchedulerSettings {
        SchedulerSettings {
            tick_interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(5),
            backoff_base: Duration::from_secs(30),
            backoff_cap: Duration::from_secs(300),
        }
    }

    fn scheduler_with(jobs: Vec<Job>) -> (Scheduler, Arc<RunLedger>) {
        let ledger = Arc::new(RunLedger::open_in_memory(100).unwrap());
        let actions: HashMap<String, Arc<dyn JobAction>> = jobs
            .iter()
            .map(|j| (j.id.clone(), Arc::new(Noop) as Arc<dyn JobAction>))
            .collect();
        let registry = JobRegistry::from_jobs(jobs);
        let scheduler =
            Scheduler::new(registry, actions, Arc::clone(&ledger), settings()).unwrap();
        (scheduler, ledger)
    }

    fn completion(
        job_id: &str,
        run_id: &str,
        attempt: u32,
        result: ActionOutcome,
        finished_at: DateTime<Utc>,
    ) -> RunCompletion {
        RunCompletion {
            job_id: job_id.to_string(),
            run_id: run_id.to_string(),
            attempt,
            result,
            finished_at,
        }
    }

    #[test]
    fn missing_action_is_rejected_at_construction() {
        let ledger = Arc::new(RunLedger::open_in_memory(100).unwrap());
        let registry = JobRegistry::from_jobs(vec![interval_job("orphan", 60)]);
        let err = match Scheduler::new(registry, HashMap::new(), ledger, settings()) {
            Err(e) => e,
            Ok(_) => panic!("expected construction to fail"),
        };
        assert!(matches!(err, SchedulerError::MissingAction(id) if id == "orphan"));
    }

    #[test]
    fn disabled_job_needs_no_action() {
        let ledger = Arc::new(RunLedger::open_in_memory(100).unwrap());
        let mut job = interval_job("off", 60);
        job.enabled = false;
        let registry = JobRegistry::from_jobs(vec![job]);
        assert!(Scheduler::new(registry, HashMap::new(), ledger, settings()).is_ok());
    }

    // The worked §8 scenario: interval 3600s, max_attempts 3, d0 = 30s,
    // cap = 300s. Two timeouts, then success.
    #[tokio::test]
    async fn backoff_cycle_then_success() {
        let (mut sched, ledger) = scheduler_with(vec![interval_job("backup-export", 3_600)]);
        let (tx, _rx) = mpsc::channel(1);
        let t0 = Utc::now();

        // Attempt 1: due immediately (no history), times out.
        assert_eq!(sched.due_now(t0).len(), 1);
        sched.dispatch_due(t0, &tx);
        assert_eq!(sched.due_now(t0).len(), 0, "running job is not due");
        let run1 = ledger.pending_runs().unwrap().remove(0);
        assert_eq!(run1.attempt, 1);

        let f1 = t0 + chrono::Duration::seconds(10);
        sched.on_completion(completion(
            "backup-export",
            &run1.id,
            1,
            ActionOutcome::Timeout,
            f1,
        ));

        let rec1 = ledger.latest_for_job("backup-export").unwrap().unwrap();
        assert_eq!(rec1.outcome, Outcome::Timeout);
        assert_eq!(
            rec1.next_eligible_at,
            Some(f1 + chrono::Duration::seconds(30)),
            "first retry at +30s"
        );

        // Not due until backoff elapses, then attempt 2 dispatches and
        // times out as well.
        assert!(sched.due_now(f1 + chrono::Duration::seconds(29)).is_empty());
        let retry1 = f1 + chrono::Duration::seconds(30);
        assert_eq!(sched.due_now(retry1).len(), 1);

        sched.dispatch_due(retry1, &tx);
        let run2 = ledger.pending_runs().unwrap().remove(0);
        assert_eq!(run2.attempt, 2);

        let f2 = retry1 + chrono::Duration::seconds(10);
        sched.on_completion(completion(
            "backup-export",
            &run2.id,
            2,
            ActionOutcome::Timeout,
            f2,
        ));
        let rec2 = ledger.latest_for_job("backup-export").unwrap().unwrap();
        assert_eq!(
            rec2.next_eligible_at,
            Some(f2 + chrono::Duration::seconds(60)),
            "second retry at +60s"
        );

        // Attempt 3 succeeds: counter resets, next due a full interval after
        // the attempt's start.
        let retry2 = f2 + chrono::Duration::seconds(60);
        sched.dispatch_due(retry2, &tx);
        let run3 = ledger.pending_runs().unwrap().remove(0);
        assert_eq!(run3.attempt, 3);

        sched.on_completion(completion(
            "backup-export",
            &run3.id,
            3,
            ActionOutcome::Success,
            retry2 + chrono::Duration::seconds(5),
        ));
        let rec3 = ledger.latest_for_job("backup-export").unwrap().unwrap();
        assert_eq!(rec3.outcome, Outcome::Success);
        assert_eq!(rec3.next_eligible_at, None);

        assert!(sched.due_now(retry2 + chrono::Duration::seconds(60)).is_empty());
        assert_eq!(
            sched.due_now(retry2 + chrono::Duration::seconds(3_600)).len(),
            1,
            "normal scheduling resumes from the successful attempt's start"
        );
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mut job = interval_job("flaky", 3_600);
        job.max_attempts = 2;
        let (mut sched, ledger) = scheduler_with(vec![job]);
        let (tx, _rx) = mpsc::channel(1);
        let t0 = Utc::now();

        sched.dispatch_due(t0, &tx);
        let run1 = ledger.pending_runs().unwrap().remove(0);
        sched.on_completion(completion(
            "flaky",
            &run1.id,
            1,
            ActionOutcome::Failure("boom".to_string()),
            t0,
        ));

        let retry = t0 + chrono::Duration::seconds(30);
        sched.dispatch_due(retry, &tx);
        let run2 = ledger.pending_runs().unwrap().remove(0);
        sched.on_completion(completion(
            "flaky",
            &run2.id,
            2,
            ActionOutcome::Failure("boom".to_string()),
            retry,
        ));

        // Terminal record: no retry gate, and no dueness until the next
        // regular trigger window.
        let rec = ledger.latest_for_job("flaky").unwrap().unwrap();
        assert_eq!(rec.outcome, Outcome::Failure);
        assert_eq!(rec.attempt, 2);
        assert_eq!(rec.next_eligible_at, None);

        assert!(sched.due_now(retry + chrono::Duration::seconds(300)).is_empty());
        // Due again one interval after the last attempted start.
        assert_eq!(sched.due_now(retry + chrono::Duration::seconds(3_600)).len(), 1);
    }

    #[tokio::test]
    async fn ledger_in_flight_guard_blocks_double_dispatch() {
        let (mut sched, ledger) = scheduler_with(vec![interval_job("job", 60)]);
        let (tx, _rx) = mpsc::channel(1);
        let t0 = Utc::now();

        sched.dispatch_due(t0, &tx);
        assert_eq!(ledger.pending_runs().unwrap().len(), 1);

        // Force the in-memory state back to idle; the ledger must still
        // refuse a second concurrent run.
        if let Some(state) = sched.states.get_mut("job") {
            state.phase = RunPhase::Idle;
            state.last_started = None;
        }
        sched.dispatch_due(t0, &tx);
        assert_eq!(ledger.pending_runs().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn seed_marks_pending_jobs_as_running_without_writing() {
        let (mut sched, ledger) = scheduler_with(vec![interval_job("inflight", 60)]);
        ledger.begin_run("inflight", 1, Utc::now()).unwrap();

        sched.seed_from_ledger().unwrap();

        // A job with a pending record is never due, even long past its
        // interval, and seeding leaves the record untouched.
        assert!(
            sched
                .due_now(Utc::now() + chrono::Duration::seconds(600))
                .is_empty()
        );
        assert_eq!(ledger.pending_runs().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recover_finalizes_interrupted_runs() {
        let (mut sched, ledger) = scheduler_with(vec![interval_job("backup-export", 3_600)]);

        let started = Utc::now() - chrono::Duration::seconds(120);
        let dangling = ledger.begin_run("backup-export", 1, started).unwrap();

        let now = Utc::now();
        let recovered = sched.recover(now).unwrap();
        assert_eq!(recovered, 1);

        let rec = ledger.latest_for_job("backup-export").unwrap().unwrap();
        assert_eq!(rec.id, dangling.id);
        assert_eq!(rec.outcome, Outcome::Failure);
        assert_eq!(rec.error.as_deref(), Some("interrupted"));
        assert_eq!(rec.next_eligible_at, Some(now + chrono::Duration::seconds(30)));

        // The job is in retry-wait, not due before the backoff gate.
        assert!(sched.due_now(now).is_empty());
        assert_eq!(sched.due_now(now + chrono::Duration::seconds(30)).len(), 1);
    }

    #[tokio::test]
    async fn recover_seeds_last_started_from_history() {
        let (mut sched, ledger) = scheduler_with(vec![interval_job("steady", 3_600)]);

        let started = Utc::now() - chrono::Duration::seconds(600);
        let record = ledger.begin_run("steady", 1, started).unwrap();
        ledger
            .finish_run(&record.id, Outcome::Success, started, None, None)
            .unwrap();

        let now = Utc::now();
        assert_eq!(sched.recover(now).unwrap(), 0);

        // Ten minutes into a one-hour interval: not due yet.
        assert!(sched.due_now(now).is_empty());
        assert_eq!(
            sched.due_now(started + chrono::Duration::seconds(3_600)).len(),
            1
        );
    }

    #[tokio::test]
    async fn recover_with_exhausted_attempts_waits_for_regular_trigger() {
        let mut job = interval_job("spent", 3_600);
        job.max_attempts = 1;
        let (mut sched, ledger) = scheduler_with(vec![job]);

        let started = Utc::now() - chrono::Duration::seconds(60);
        ledger.begin_run("spent", 1, started).unwrap();

        let now = Utc::now();
        assert_eq!(sched.recover(now).unwrap(), 1);

        let rec = ledger.latest_for_job("spent").unwrap().unwrap();
        assert_eq!(rec.error.as_deref(), Some("interrupted"));
        assert_eq!(rec.next_eligible_at, None);

        assert!(sched.due_now(now + chrono::Duration::seconds(300)).is_empty());
        assert_eq!(
            sched.due_now(started + chrono::Duration::seconds(3_600)).len(),
            1
        );
    }
}
