//! External action invokers for vaultsched jobs.
//!
//! The scheduler core treats a job's action as an opaque [`JobAction`]; this
//! crate supplies the concrete implementations and resolves [`ActionRef`]
//! config data into them once at startup:
//! - [`VaultExportAction`] — trigger a backup export through the vault API,
//! - [`WebhookAction`] — POST a JSON payload to a URL,
//! - [`CommandAction`] — run a local program.
//!
//! All invokers are safe to abandon mid-flight: they either fire a single
//! HTTP request the server completes on its own, or run a child process the
//! caller can orphan.

mod command;
mod error;
mod vault;
mod webhook;

use std::sync::Arc;

use vaultsched_scheduler::{ActionRef, JobAction, VaultConfig};

pub use command::CommandAction;
pub use error::ActionError;
pub use vault::{VaultClient, VaultExportAction};
pub use webhook::WebhookAction;

/// Resolves [`ActionRef`]s to invokers. Built once at startup so every
/// `vault_export` job shares one [`VaultClient`] (and its cached token).
pub struct ActionResolver {
    vault: Option<Arc<VaultClient>>,
}

impl ActionResolver {
    pub fn new(vault: Option<&VaultConfig>) -> Self {
        Self {
            vault: vault.map(|config| Arc::new(VaultClient::new(config))),
        }
    }

    /// Turn config data into a runnable action.
    ///
    /// Fails when the reference needs collaborator configuration that is
    /// absent (a `vault_export` job without a `[vault]` section) — a startup
    /// error, never discovered at dispatch time.
    pub fn resolve(&self, action: &ActionRef) -> Result<Arc<dyn JobAction>, ActionError> {
        match action {
            ActionRef::VaultExport { endpoint } => {
                let client = self
                    .vault
                    .as_ref()
                    .ok_or(ActionError::MissingVaultConfig)?;
                Ok(Arc::new(VaultExportAction::new(
                    Arc::clone(client),
                    endpoint.as_deref(),
                )))
            }
            ActionRef::Webhook { url, payload } => {
                Ok(Arc::new(WebhookAction::new(url, payload.clone())))
            }
            ActionRef::Command { program, args } => {
                Ok(Arc::new(CommandAction::new(program, args.clone())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_export_without_vault_config_is_rejected() {
        let resolver = ActionResolver::new(None);
        let err = match resolver.resolve(&ActionRef::VaultExport { endpoint: None }) {
            Err(e) => e,
            Ok(_) => panic!("expected resolve to fail"),
        };
        assert!(matches!(err, ActionError::MissingVaultConfig));
    }

    #[test]
    fn webhook_and_command_need_no_collaborators() {
        let resolver = ActionResolver::new(None);
        assert!(
            resolver
                .resolve(&ActionRef::Webhook {
                    url: "https://ops.example.com/ping".to_string(),
                    payload: None,
                })
                .is_ok()
        );
        assert!(
            resolver
                .resolve(&ActionRef::Command {
                    program: "true".to_string(),
                    args: vec![],
                })
                .is_ok()
        );
    }
}
