//! Error types for action invokers.

use thiserror::Error;

/// Errors raised while resolving or invoking an action.
///
/// At invocation time these never escape past the executor: they become the
/// recorded failure reason. At resolve time they are startup errors.
#[derive(Debug, Error)]
pub enum ActionError {
    /// A `vault_export` action was configured without a `[vault]` section.
    #[error("vault_export action requires [vault] configuration")]
    MissingVaultConfig,

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The vault rejected the credential-grant login.
    #[error("vault login failed: {0}")]
    Login(String),

    /// An endpoint answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// A command action exited non-zero.
    #[error("command exited with status {status}: {stderr}")]
    CommandFailed { status: i32, stderr: String },

    /// The command could not be spawned at all.
    #[error("failed to run command: {0}")]
    Spawn(#[from] std::io::Error),
}
