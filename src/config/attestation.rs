use std::path::PathBuf;

use crate::attestation::TokenType;
use crate::config::helpers::{optional_env, parse_bool_env};
use crate::error::ConfigError;
use crate::settings::Settings;

/// vTPM attestation configuration.
#[derive(Debug, Clone)]
pub struct AttestationConfig {
    pub simulate: bool,
    pub socket_path: PathBuf,
    pub audience: String,
    pub token_type: TokenType,
}

impl AttestationConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let simulate = parse_bool_env("SIMULATE_ATTESTATION", settings.attestation.simulate)?;
        let socket_path = optional_env("ATTESTATION_SOCKET_PATH")?
            .unwrap_or_else(|| settings.attestation.socket_path.clone());
        let audience = optional_env("ATTESTATION_AUDIENCE")?
            .unwrap_or_else(|| settings.attestation.audience.clone());

        let raw_token_type = optional_env("ATTESTATION_TOKEN_TYPE")?
            .unwrap_or_else(|| settings.attestation.token_type.clone());
        let token_type =
            TokenType::parse(&raw_token_type).ok_or_else(|| ConfigError::InvalidValue {
                key: "ATTESTATION_TOKEN_TYPE".to_string(),
                message: format!("expected 'OIDC' or 'PKI', got '{raw_token_type}'"),
            })?;

        Ok(Self {
            simulate,
            socket_path: PathBuf::from(socket_path),
            audience,
            token_type,
        })
    }
}
