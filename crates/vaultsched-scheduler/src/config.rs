//! Configuration for the daemon: a TOML file plus `VAULTSCHED_*` environment
//! overrides.
//!
//! The file is a read-only snapshot: it is loaded once at startup and only a
//! restart picks up changes. Raw specs here are string-typed where durations
//! are involved; [`JobRegistry`](crate::JobRegistry) turns them into validated
//! [`Job`](crate::Job)s and rejects anything malformed before the loop starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level config (`vaultsched.toml` + `VAULTSCHED_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the SQLite run ledger.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Control-loop tick. Minimum 1s.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: String,
    /// How long in-flight runs may keep going after a stop request.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: String,
    /// First retry delay (`d0` in `min(d0 * 2^(n-1), cap)`).
    #[serde(default = "default_backoff_base")]
    pub backoff_base: String,
    /// Upper bound on retry delays.
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap: String,
    /// Run records retained per job.
    #[serde(default = "default_history_per_job")]
    pub history_per_job: usize,
    /// Vault connection details, required only when a job uses a
    /// `vault_export` action.
    #[serde(default)]
    pub vault: Option<VaultConfig>,
    /// The job set.
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
}

/// Connection details for the vault's HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Per-request timeout for vault API calls.
    #[serde(default = "default_vault_timeout_secs")]
    pub timeout_secs: u64,
}

/// A job as written in configuration, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub id: String,
    /// Interval schedule, e.g. `"1h"`, `"90s"`, `"1d12h"`. Mutually exclusive
    /// with `cron`.
    #[serde(default)]
    pub every: Option<String>,
    /// Cron schedule, 5-field (`min hour dom month dow`) or 6-field with a
    /// leading seconds column. Mutually exclusive with `every`.
    #[serde(default)]
    pub cron: Option<String>,
    /// What the job does.
    pub action: ActionRef,
    /// Hard per-run deadline.
    #[serde(default = "default_job_timeout")]
    pub timeout: String,
    /// Consecutive attempts before giving up the cycle.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Reference to an external operation. Resolved to a concrete invoker once at
/// startup; the scheduler core treats it as opaque data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionRef {
    /// Trigger a vault backup export through the vault API.
    VaultExport {
        /// Override for the export endpoint path.
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// POST a JSON payload to a URL.
    Webhook {
        url: String,
        #[serde(default)]
        payload: Option<serde_json::Value>,
    },
    /// Run a local program; non-zero exit is failure.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl ActionRef {
    /// Short label for logs and listings.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionRef::VaultExport { .. } => "vault_export",
            ActionRef::Webhook { .. } => "webhook",
            ActionRef::Command { .. } => "command",
        }
    }
}

impl Config {
    /// Load configuration from `path`, then apply `VAULTSCHED_*` environment
    /// overrides (`VAULTSCHED_VAULT__CLIENT_ID` targets `vault.client_id`).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("VAULTSCHED_").split("__"))
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            tick_interval: default_tick_interval(),
            shutdown_grace: default_shutdown_grace(),
            backoff_base: default_backoff_base(),
            backoff_cap: default_backoff_cap(),
            history_per_job: default_history_per_job(),
            vault: None,
            jobs: Vec::new(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("vaultsched.db")
}

fn default_tick_interval() -> String {
    "1s".to_string()
}

fn default_shutdown_grace() -> String {
    "30s".to_string()
}

fn default_backoff_base() -> String {
    "30s".to_string()
}

fn default_backoff_cap() -> String {
    "300s".to_string()
}

fn default_history_per_job() -> usize {
    100
}

fn default_vault_timeout_secs() -> u64 {
    10
}

fn default_job_timeout() -> String {
    "10m".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_enabled() -> bool {
    true
}

/// Parse a human-readable duration string into a [`Duration`].
///
/// Supports components: `Xd` (days), `Xh` (hours), `Xm` (minutes), `Xs`
/// (seconds). Components can be combined: "2h30m", "1d12h", "90s". A bare
/// number is seconds. Returns `None` if the string is empty or unparseable.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut total_secs: u64 = 0;
    let mut num_buf = String::new();
    let mut found_unit = false;

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            num_buf.push(ch);
        } else {
            let n: u64 = num_buf.parse().ok()?;
            num_buf.clear();
            match ch {
                'd' => total_secs += n * 86_400,
                'h' => total_secs += n * 3_600,
                'm' => total_secs += n * 60,
                's' => total_secs += n,
                _ => return None,
            }
            found_unit = true;
        }
    }

    // Handle trailing number without unit (treat as seconds).
    if !num_buf.is_empty() {
        if found_unit {
            // Ambiguous: "30m15" — reject rather than guess.
            return None;
        }
        let n: u64 = num_buf.parse().ok()?;
        total_secs += n;
    }

    if total_secs == 0 && !found_unit {
        return None;
    }

    Some(Duration::from_secs(total_secs))
}
