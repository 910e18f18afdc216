//! Error types for Artemis.

use std::time::Duration;

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Attestation error: {0}")]
    Attestation(#[from] AttestationError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Completion provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} timed out after {after:?}")]
    Timeout { provider: String, after: Duration },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Prompt library errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("Prompt '{0}' not found in library")]
    NotFound(String),

    #[error("Prompt '{prompt}' is missing required inputs: {}", missing.join(", "))]
    MissingInput {
        prompt: String,
        missing: Vec<String>,
    },
}

/// Chain RPC and signing errors.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Account does not exist")]
    NoAccount,

    #[error("No transaction is awaiting confirmation")]
    NoPendingTransaction,

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed response to {method}: {reason}")]
    MalformedResponse { method: String, reason: String },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("No receipt for transaction {tx_hash} after {attempts} polls")]
    ReceiptTimeout { tx_hash: String, attempts: u32 },

    #[error("Chain operation {operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Attestation service errors.
#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("Nonce is {len} bytes; must be between {min} and {max} bytes")]
    InvalidNonce { len: usize, min: usize, max: usize },

    #[error("At least one nonce is required")]
    NoNonces,

    #[error("Failed to connect to attestation socket {path}: {reason}")]
    Connection { path: String, reason: String },

    #[error("Failed to get attestation response: {status} {reason}")]
    UnexpectedStatus { status: u16, reason: String },

    #[error("Attestation request failed: {0}")]
    Request(String),

    #[error("Attestation request timed out after {after:?}")]
    Timeout { after: Duration },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Terminal error: {0}")]
    Terminal(String),
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
