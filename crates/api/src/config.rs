//! Environment-driven configuration : every tunable the façade needs,
//! read once at process start by whichever `weave-*` binary is running.

use std::env::VarError;
use std::time::Duration;

use weave_credential::EncryptionKey;
use weave_facade::FacadeConfig;

/// Everything a `weave-api` binary reads from its environment before it
/// can build an [`crate::state::AppState`].
#[derive(Clone)]
pub struct ApiConfig {
    /// Address the HTTP server binds to. `BIND_ADDR`, default `0.0.0.0:8080`.
    pub bind_addr: String,
    /// AES-256 key credentials are encrypted under. `CREDENTIAL_ENCRYPTION_KEY`,
    /// 64 hex characters. Required — there is no insecure default.
    pub credential_key: EncryptionKey,
    /// `MAX_EXECUTION_CONCURRENCY`, default 8.
    pub max_execution_concurrency: usize,
    /// How long a terminal execution's in-memory progress state is kept
    /// before the background retention sweep evicts it.
    /// `EXECUTION_RETENTION_MS`, default 24h. Persisted rows are
    /// unaffected — this only bounds the [`weave_execution::ProgressTracker`]'s
    /// memory.
    pub execution_retention: Duration,
    /// Grace period between a cancellation signal and force-abandoning a
    /// node's task. `WEBHOOK_GRACE_PERIOD_MS`, default 5000.
    pub grace_period: Duration,
}

/// Failure building [`ApiConfig`] from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable was absent.
    #[error("{0} is required")]
    Missing(&'static str),
    /// A variable was present but not valid for its type.
    #[error("{0} is invalid: {1}")]
    Invalid(&'static str, String),
}

impl ApiConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credential_key_hex = require("CREDENTIAL_ENCRYPTION_KEY")?;
        let credential_key = EncryptionKey::from_hex(&credential_key_hex)
            .map_err(|e| ConfigError::Invalid("CREDENTIAL_ENCRYPTION_KEY", e.to_string()))?;

        Ok(Self {
            bind_addr: optional("BIND_ADDR", "0.0.0.0:8080".to_string())?,
            credential_key,
            max_execution_concurrency: optional_parsed("MAX_EXECUTION_CONCURRENCY", 8)?,
            execution_retention: Duration::from_millis(optional_parsed(
                "EXECUTION_RETENTION_MS",
                24 * 60 * 60 * 1000,
            )?),
            grace_period: Duration::from_millis(optional_parsed("WEBHOOK_GRACE_PERIOD_MS", 5_000)?),
        })
    }

    /// The façade-level subset of this config.
    #[must_use]
    pub fn facade_config(&self) -> FacadeConfig {
        FacadeConfig {
            max_execution_concurrency: self.max_execution_concurrency,
            grace_period: self.grace_period,
        }
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) => Ok(value),
        Err(VarError::NotPresent) => Err(ConfigError::Missing(name)),
        Err(VarError::NotUnicode(_)) => {
            Err(ConfigError::Invalid(name, "not valid UTF-8".to_string()))
        }
    }
}

fn optional(name: &'static str, default: String) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) => Ok(value),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => {
            Err(ConfigError::Invalid(name, "not valid UTF-8".to_string()))
        }
    }
}

fn optional_parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid(name, format!("{value:?} is not a number"))),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => {
            Err(ConfigError::Invalid(name, "not valid UTF-8".to_string()))
        }
    }
}
