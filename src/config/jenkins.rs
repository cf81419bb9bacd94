//! # Jenkins Configuration

use super::{env_var_or_default, env_var_or_default_str};
use std::time::Duration;

/// Connection settings for the Jenkins CI engine
#[derive(Clone)]
pub struct JenkinsConfig {
    /// Base URL, without trailing slash
    pub url: String,
    /// User the API token belongs to
    pub user: String,
    /// API token (never logged)
    pub token: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl std::fmt::Debug for JenkinsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JenkinsConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("token", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        use crate::constants::{DEFAULT_JENKINS_TIMEOUT_SECS, DEFAULT_JENKINS_URL};
        Self {
            url: DEFAULT_JENKINS_URL.to_string(),
            user: "admin".to_string(),
            token: String::new(),
            timeout_secs: DEFAULT_JENKINS_TIMEOUT_SECS,
        }
    }
}

impl JenkinsConfig {
    pub fn from_env() -> Self {
        use crate::constants::{DEFAULT_JENKINS_TIMEOUT_SECS, DEFAULT_JENKINS_URL};
        Self {
            url: env_var_or_default_str("JENKINS_URL", DEFAULT_JENKINS_URL)
                .trim_end_matches('/')
                .to_string(),
            user: env_var_or_default_str("JENKINS_USER", "admin"),
            token: env_var_or_default_str("JENKINS_TOKEN", ""),
            timeout_secs: env_var_or_default("JENKINS_TIMEOUT_SECS", DEFAULT_JENKINS_TIMEOUT_SECS),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
