use std::time::Duration;

use crate::config::helpers::{optional_env, parse_env, validate_http_url};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Chain RPC configuration.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub explorer_url: String,
    pub native_symbol: String,
    pub receipt_poll_attempts: u32,
    pub receipt_poll_interval: Duration,
}

impl ChainConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let rpc_url =
            optional_env("WEB3_PROVIDER_URL")?.unwrap_or_else(|| settings.chain.rpc_url.clone());
        validate_http_url("WEB3_PROVIDER_URL", &rpc_url)?;

        let explorer_url = optional_env("WEB3_EXPLORER_URL")?
            .unwrap_or_else(|| settings.chain.explorer_url.clone());
        validate_http_url("WEB3_EXPLORER_URL", &explorer_url)?;

        let native_symbol = optional_env("NATIVE_TOKEN_SYMBOL")?
            .unwrap_or_else(|| settings.chain.native_symbol.clone());

        let receipt_poll_attempts = parse_env(
            "CHAIN_RECEIPT_POLL_ATTEMPTS",
            settings.chain.receipt_poll_attempts,
        )?;
        if receipt_poll_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CHAIN_RECEIPT_POLL_ATTEMPTS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let interval_ms = parse_env(
            "CHAIN_RECEIPT_POLL_INTERVAL_MS",
            settings.chain.receipt_poll_interval_ms,
        )?;

        Ok(Self {
            rpc_url,
            explorer_url,
            native_symbol,
            receipt_poll_attempts,
            receipt_poll_interval: Duration::from_millis(interval_ms),
        })
    }
}
