//! Remote attestation oracle.
//!
//! A token request carries caller-supplied nonces for replay protection. Nonce
//! bounds are checked when the request is built, so no invalid request ever
//! reaches the attestation service.

mod vtpm;

use async_trait::async_trait;
use serde::Serialize;

pub use self::vtpm::{SIMULATED_TOKEN, VtpmClient};

use crate::error::AttestationError;

/// Minimum UTF-8 byte length of a nonce.
pub const MIN_NONCE_BYTES: usize = 10;
/// Maximum UTF-8 byte length of a nonce.
pub const MAX_NONCE_BYTES: usize = 74;

/// Attestation token flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenType {
    #[serde(rename = "OIDC")]
    Oidc,
    #[serde(rename = "PKI")]
    Pki,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oidc => "OIDC",
            Self::Pki => "PKI",
        }
    }

    /// Case-insensitive parse of `OIDC` / `PKI`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OIDC" => Some(Self::Oidc),
            "PKI" => Some(Self::Pki),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check a nonce's UTF-8 byte length against the service bounds.
pub fn validate_nonce(nonce: &str) -> Result<(), AttestationError> {
    let len = nonce.len();
    if !(MIN_NONCE_BYTES..=MAX_NONCE_BYTES).contains(&len) {
        return Err(AttestationError::InvalidNonce {
            len,
            min: MIN_NONCE_BYTES,
            max: MAX_NONCE_BYTES,
        });
    }
    Ok(())
}

/// A validated token request. Serializes to the `/v1/token` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenRequest {
    audience: String,
    token_type: TokenType,
    nonces: Vec<String>,
}

impl TokenRequest {
    pub fn new(
        nonces: Vec<String>,
        audience: impl Into<String>,
        token_type: TokenType,
    ) -> Result<Self, AttestationError> {
        if nonces.is_empty() {
            return Err(AttestationError::NoNonces);
        }
        for nonce in &nonces {
            validate_nonce(nonce)?;
        }
        Ok(Self {
            audience: audience.into(),
            token_type,
            nonces,
        })
    }

    pub fn nonces(&self) -> &[String] {
        &self.nonces
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn token_type(&self) -> TokenType {
        self.token_type
    }
}

/// A token-issuing attestation service.
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    /// Audience requested tokens are bound to.
    fn audience(&self) -> &str;

    fn token_type(&self) -> TokenType;

    async fn request_token(&self, request: &TokenRequest) -> Result<String, AttestationError>;
}
