use secrecy::SecretString;

use crate::config::helpers::{optional_env, validate_http_url};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Completion oracle configuration (Gemini).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `None` when `GEMINI_API_KEY` is unset; the binary refuses to start
    /// a router without it.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
}

impl LlmConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let api_key = optional_env("GEMINI_API_KEY")?.map(SecretString::from);
        let model = optional_env("GEMINI_MODEL")?.unwrap_or_else(|| settings.llm.model.clone());
        let base_url =
            optional_env("GEMINI_BASE_URL")?.unwrap_or_else(|| settings.llm.base_url.clone());
        validate_http_url("GEMINI_BASE_URL", &base_url)?;

        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The API key, or a `MissingRequired` error with a setup hint.
    pub fn require_api_key(&self) -> Result<SecretString, ConfigError> {
        self.api_key.clone().ok_or_else(|| ConfigError::MissingRequired {
            key: "GEMINI_API_KEY".to_string(),
            hint: "Set it in the environment or in ~/.artemis/.env".to_string(),
        })
    }
}
