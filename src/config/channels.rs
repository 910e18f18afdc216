use crate::config::helpers::{optional_env, parse_env, parse_list_env};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Web gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Path segment of the chat route: `/api/{api_version}/chat/`.
    pub api_version: String,
    /// Allowed CORS origins. `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// Chat requests per 60-second window.
    pub chat_rate_limit: u64,
}

impl GatewayConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let host = optional_env("GATEWAY_HOST")?.unwrap_or_else(|| settings.gateway.host.clone());
        let port = parse_env("GATEWAY_PORT", settings.gateway.port)?;
        let api_version =
            optional_env("API_VERSION")?.unwrap_or_else(|| settings.gateway.api_version.clone());
        if api_version.contains('/') {
            return Err(ConfigError::InvalidValue {
                key: "API_VERSION".to_string(),
                message: "must be a single path segment".to_string(),
            });
        }

        let cors_origins =
            parse_list_env("CORS_ORIGINS")?.unwrap_or_else(|| settings.gateway.cors_origins.clone());

        let chat_rate_limit = parse_env("CHAT_RATE_LIMIT", settings.gateway.chat_rate_limit)?;
        if chat_rate_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CHAT_RATE_LIMIT".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        Ok(Self {
            host,
            port,
            api_version,
            cors_origins,
            chat_rate_limit,
        })
    }

    /// Whether CORS should accept any origin.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}
