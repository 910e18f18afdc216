//! Configuration for Artemis.
//!
//! Settings are loaded with priority: env var > `~/.artemis/config.toml` >
//! default. Env files (`./.env`, `~/.artemis/.env`) are loaded via dotenvy
//! early in startup, so they behave like env vars here.

mod agent;
mod attestation;
mod chain;
mod channels;
pub(crate) mod helpers;
mod llm;

use std::path::Path;

use crate::error::ConfigError;
use crate::settings::Settings;

pub use self::agent::AgentConfig;
pub use self::attestation::AttestationConfig;
pub use self::chain::ChainConfig;
pub use self::channels::GatewayConfig;
pub use self::llm::LlmConfig;

/// Main configuration for the agent.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub chain: ChainConfig,
    pub attestation: AttestationConfig,
    pub gateway: GatewayConfig,
    pub agent: AgentConfig,
}

impl Config {
    /// Load env files and the default settings file, then resolve.
    pub fn from_env() -> Result<Self, ConfigError> {
        crate::bootstrap::load_artemis_env();
        Self::from_env_with_toml(&Settings::default_toml_path())
    }

    /// Resolve using the settings file at `toml_path` as the fallback layer.
    pub fn from_env_with_toml(toml_path: &Path) -> Result<Self, ConfigError> {
        let settings = Settings::load_toml(toml_path)
            .map_err(ConfigError::ParseError)?
            .unwrap_or_default();
        Self::build(&settings)
    }

    /// Resolve every section against the given settings.
    pub fn build(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            llm: LlmConfig::resolve(settings)?,
            chain: ChainConfig::resolve(settings)?,
            attestation: AttestationConfig::resolve(settings)?,
            gateway: GatewayConfig::resolve(settings)?,
            agent: AgentConfig::resolve(settings)?,
        })
    }
}
