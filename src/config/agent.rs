use std::time::Duration;

use crate::config::helpers::{optional_env, parse_env};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Router behaviour configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Timeout applied to each completion, chain and attestation call.
    pub oracle_timeout: Duration,
    pub command_prefix: String,
    /// Idle time after which a gateway session is dropped.
    pub session_idle_timeout: Duration,
}

impl AgentConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let timeout_secs = parse_env("ORACLE_TIMEOUT_SECS", settings.agent.oracle_timeout_secs)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ORACLE_TIMEOUT_SECS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let command_prefix = optional_env("COMMAND_PREFIX")?
            .unwrap_or_else(|| settings.agent.command_prefix.clone());
        if command_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "COMMAND_PREFIX".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let idle_secs = parse_env(
            "SESSION_IDLE_TIMEOUT_SECS",
            settings.agent.session_idle_timeout_secs,
        )?;
        if idle_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SESSION_IDLE_TIMEOUT_SECS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        Ok(Self {
            oracle_timeout: Duration::from_secs(timeout_secs),
            command_prefix,
            session_idle_timeout: Duration::from_secs(idle_secs),
        })
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            oracle_timeout: Duration::from_secs(30),
            command_prefix: "/".to_string(),
            session_idle_timeout: crate::agent::session::DEFAULT_SESSION_IDLE_TIMEOUT,
        }
    }
}
