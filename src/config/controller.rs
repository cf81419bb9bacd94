//! # Controller Configuration

use super::{env_var_or_default, env_var_or_default_str, JenkinsConfig};
use std::time::Duration;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("text") {
            LogFormat::Text
        } else {
            LogFormat::Json
        }
    }
}

/// Controller-level configuration
///
/// All settings have defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Port of the HTTP server (metrics, probes, Jenkins event webhook)
    pub metrics_port: u16,
    /// Concurrent reconciliations for `DevOpsProject`
    pub project_workers: u16,
    /// Concurrent reconciliations for `Pipeline`
    pub pipeline_workers: u16,
    /// Concurrent reconciliations for credential secrets
    pub credential_workers: u16,
    /// Base delay of the per-key failure rate limiter (milliseconds)
    pub backoff_base_ms: u64,
    /// Ceiling of the per-key failure rate limiter (seconds)
    pub backoff_max_secs: u64,
    /// Maximum accepted webhook body size (bytes)
    pub webhook_body_limit: usize,
    /// Log format (json, text)
    pub log_format: LogFormat,
    /// Jenkins connection settings
    pub jenkins: JenkinsConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            project_workers: DEFAULT_PROJECT_WORKERS,
            pipeline_workers: DEFAULT_PIPELINE_WORKERS,
            credential_workers: DEFAULT_CREDENTIAL_WORKERS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            webhook_body_limit: DEFAULT_WEBHOOK_BODY_LIMIT,
            log_format: LogFormat::Json,
            jenkins: JenkinsConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            project_workers: env_var_or_default("PROJECT_WORKERS", DEFAULT_PROJECT_WORKERS),
            pipeline_workers: env_var_or_default("PIPELINE_WORKERS", DEFAULT_PIPELINE_WORKERS),
            credential_workers: env_var_or_default(
                "CREDENTIAL_WORKERS",
                DEFAULT_CREDENTIAL_WORKERS,
            ),
            backoff_base_ms: env_var_or_default("BACKOFF_BASE_MS", DEFAULT_BACKOFF_BASE_MS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            webhook_body_limit: env_var_or_default(
                "WEBHOOK_BODY_LIMIT",
                DEFAULT_WEBHOOK_BODY_LIMIT,
            ),
            log_format: LogFormat::parse(&env_var_or_default_str("LOG_FORMAT", "json")),
            jenkins: JenkinsConfig::from_env(),
        }
    }

    /// Get rate limiter base delay
    pub fn backoff_base_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Get rate limiter ceiling
    pub fn backoff_max_duration(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }
}
