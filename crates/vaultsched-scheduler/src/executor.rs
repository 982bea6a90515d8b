//! Bounded execution of job actions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use vaultsched_ledger::Outcome;

/// Callable contract for a job's external operation.
///
/// Implementations may take arbitrarily long; the executor enforces the
/// deadline, not the action. An abandoned invocation must be safe to abandon
/// (idempotent or resumable) — that is the action's side of the contract and
/// is not enforced here.
#[async_trait]
pub trait JobAction: Send + Sync {
    async fn invoke(&self) -> Result<(), String>;
}

/// Result of one bounded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    Failure(String),
    Timeout,
}

impl ActionOutcome {
    /// The ledger form of this outcome.
    pub fn outcome(&self) -> Outcome {
        match self {
            ActionOutcome::Success => Outcome::Success,
            ActionOutcome::Failure(_) => Outcome::Failure,
            ActionOutcome::Timeout => Outcome::Timeout,
        }
    }

    /// The recorded reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ActionOutcome::Success => None,
            ActionOutcome::Failure(reason) => Some(reason),
            ActionOutcome::Timeout => Some("deadline elapsed"),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success)
    }
}

/// Runs actions under a hard deadline, converting every way an action can go
/// wrong — error, panic, overrun — into a terminal [`ActionOutcome`] so the
/// control loop never crashes on a bad action.
pub struct Executor;

impl Executor {
    /// Invoke `action` once with `deadline` as the hard limit.
    ///
    /// The action runs in its own task: a panic inside it is contained and
    /// reported as failure, and on timeout the task is aborted rather than
    /// awaited indefinitely.
    pub async fn execute(action: Arc<dyn JobAction>, deadline: Duration) -> ActionOutcome {
        let task = tokio::spawn(async move { action.invoke().await });
        let abort = task.abort_handle();

        match timeout(deadline, task).await {
            Ok(Ok(Ok(()))) => ActionOutcome::Success,
            Ok(Ok(Err(reason))) => ActionOutcome::Failure(reason),
            Ok(Err(join_err)) => ActionOutcome::Failure(format!("action crashed: {join_err}")),
            Err(_) => {
                // Force-abandon the overrunning invocation.
                abort.abort();
                ActionOutcome::Timeout
            }
        }
    }
}
