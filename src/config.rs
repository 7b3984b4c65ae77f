use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::gate::RetryPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid { key: String, value: String, reason: String },
}

/// Process configuration, read once from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub http_port: u16,
    pub profile_retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self { bind: "0.0.0.0".to_string(), http_port: 7878, profile_retry: RetryPolicy::default() }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let bind = lookup("UNISHORTS_BIND").unwrap_or(defaults.bind);
        let http_port = load(&lookup, "UNISHORTS_HTTP_PORT", defaults.http_port)?;
        let attempts: u32 = load(&lookup, "UNISHORTS_PROFILE_RETRY_ATTEMPTS", defaults.profile_retry.max_attempts)?;
        if attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "UNISHORTS_PROFILE_RETRY_ATTEMPTS".into(),
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        let base_ms: u64 = load(&lookup, "UNISHORTS_PROFILE_RETRY_BASE_MS", defaults.profile_retry.base_delay.as_millis() as u64)?;
        let max_ms: u64 = load(&lookup, "UNISHORTS_PROFILE_RETRY_MAX_MS", defaults.profile_retry.max_delay.as_millis() as u64)?;
        Ok(Self {
            bind,
            http_port,
            profile_retry: RetryPolicy::new(attempts, Duration::from_millis(base_ms), Duration::from_millis(max_ms.max(base_ms))),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.http_port)
    }
}

fn load<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => {
            info!(target: "unishorts::config", "{} not set, using default: {}", key, default);
            Ok(default)
        }
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
