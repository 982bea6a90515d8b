//! Command action: run a local program.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use vaultsched_scheduler::JobAction;

use crate::error::ActionError;

/// How much stderr ends up in the recorded failure reason.
const STDERR_SNIPPET_LEN: usize = 512;

/// Runs a configured program to completion; a non-zero exit status is
/// failure, with a stderr snippet as the reason.
pub struct CommandAction {
    program: String,
    args: Vec<String>,
}

impl CommandAction {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }

    async fn run(&self) -> Result<(), ActionError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let snippet: String = stderr.trim().chars().take(STDERR_SNIPPET_LEN).collect();
            return Err(ActionError::CommandFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: snippet,
            });
        }

        debug!(program = %self.program, "command completed");
        Ok(())
    }
}

#[async_trait]
impl JobAction for CommandAction {
    async fn invoke(&self) -> Result<(), String> {
        self.run().await.map_err(|e| e.to_string())
    }
}
