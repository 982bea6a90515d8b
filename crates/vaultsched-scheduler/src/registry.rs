//! The job registry: the validated, immutable job set.

use std::collections::HashSet;
use std::str::FromStr;

use crate::config::{Config, JobSpec, parse_duration};
use crate::error::ConfigError;
use crate::trigger::normalize_cron;
use crate::types::{Job, JobSchedule};

/// Holds every configured job, keyed by id, loaded once at startup.
///
/// Construction validates the whole set; a registry that exists is a registry
/// the scheduler can trust. There is no live reload — restart the daemon to
/// pick up config changes.
#[derive(Debug, Clone)]
pub struct JobRegistry {
    jobs: Vec<Job>,
}

impl JobRegistry {
    /// Build and validate the registry from raw configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut jobs = Vec::with_capacity(config.jobs.len());

        for spec in &config.jobs {
            if spec.id.trim().is_empty() {
                return Err(ConfigError::InvalidJobId(spec.id.clone()));
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(ConfigError::DuplicateJobId(spec.id.clone()));
            }
            jobs.push(validate_spec(spec)?);
        }

        Ok(Self { jobs })
    }

    /// Bypass validation; unit tests build jobs directly.
    #[cfg(test)]
    pub(crate) fn from_jobs(jobs: Vec<Job>) -> Self {
        Self { jobs }
    }

    /// Look up a job by id.
    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// All jobs, in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

fn validate_spec(spec: &JobSpec) -> Result<Job, ConfigError> {
    let schedule = match (&spec.every, &spec.cron) {
        (Some(every), None) => {
            let every = parse_duration(every).ok_or_else(|| ConfigError::InvalidDuration {
                job_id: spec.id.clone(),
                value: every.clone(),
            })?;
            if every.is_zero() {
                return Err(ConfigError::ZeroInterval {
                    job_id: spec.id.clone(),
                });
            }
            JobSchedule::Interval { every }
        }
        (None, Some(cron)) => {
            let expression = normalize_cron(cron);
            let schedule =
                cron::Schedule::from_str(&expression).map_err(|e| ConfigError::InvalidCron {
                    job_id: spec.id.clone(),
                    expression: cron.clone(),
                    reason: e.to_string(),
                })?;
            JobSchedule::Cron {
                schedule,
                expression,
            }
        }
        _ => {
            return Err(ConfigError::AmbiguousSchedule {
                job_id: spec.id.clone(),
            });
        }
    };

    let timeout = parse_duration(&spec.timeout).ok_or_else(|| ConfigError::InvalidDuration {
        job_id: spec.id.clone(),
        value: spec.timeout.clone(),
    })?;

    if spec.max_attempts == 0 {
        return Err(ConfigError::ZeroAttempts {
            job_id: spec.id.clone(),
        });
    }

    Ok(Job {
        id: spec.id.clone(),
        schedule,
        action: spec.action.clone(),
        timeout,
        max_attempts: spec.max_attempts,
        enabled: spec.enabled,
    })
}
