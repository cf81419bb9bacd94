//! # Configuration
//!
//! Controller-level settings loaded from environment variables.
//!
//! - `controller`: worker counts, rate limiter bounds, HTTP port, logging
//! - `jenkins`: Jenkins endpoint and credentials

mod controller;
mod jenkins;

pub use controller::{ControllerConfig, LogFormat};
pub use jenkins::JenkinsConfig;

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
pub(crate) fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
