//! User settings persistence.
//!
//! Stores user preferences in `~/.artemis/config.toml`.
//! Settings are loaded with env var > config.toml > default priority; the
//! env var layer is applied by [`crate::config`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// User settings persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub chain: ChainSettings,

    #[serde(default)]
    pub attestation: AttestationSettings,

    #[serde(default)]
    pub gateway: GatewaySettings,

    #[serde(default)]
    pub agent: AgentSettings,
}

/// Completion oracle settings. The API key is env-only and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSettings {
    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
        }
    }
}

/// Chain RPC settings (Coston2 testnet by default).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainSettings {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,

    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,

    /// Number of `eth_getTransactionReceipt` polls after submission.
    #[serde(default = "default_receipt_poll_attempts")]
    pub receipt_poll_attempts: u32,

    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

fn default_rpc_url() -> String {
    "https://coston2-api.flare.network/ext/C/rpc".to_string()
}

fn default_explorer_url() -> String {
    "https://coston2-explorer.flare.network/".to_string()
}

fn default_native_symbol() -> String {
    "C2FLR".to_string()
}

fn default_receipt_poll_attempts() -> u32 {
    20
}

fn default_receipt_poll_interval_ms() -> u64 {
    1_000
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            explorer_url: default_explorer_url(),
            native_symbol: default_native_symbol(),
            receipt_poll_attempts: default_receipt_poll_attempts(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
        }
    }
}

/// vTPM attestation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttestationSettings {
    #[serde(default)]
    pub simulate: bool,

    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    #[serde(default = "default_audience")]
    pub audience: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_socket_path() -> String {
    "/run/container_launcher/teeserver.sock".to_string()
}

fn default_audience() -> String {
    "https://sts.google.com".to_string()
}

fn default_token_type() -> String {
    "OIDC".to_string()
}

impl Default for AttestationSettings {
    fn default() -> Self {
        Self {
            simulate: false,
            socket_path: default_socket_path(),
            audience: default_audience(),
            token_type: default_token_type(),
        }
    }
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewaySettings {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Chat requests allowed per 60-second window.
    #[serde(default = "default_chat_rate_limit")]
    pub chat_rate_limit: u64,
}

fn default_gateway_host() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_chat_rate_limit() -> u64 {
    60
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            api_version: default_api_version(),
            cors_origins: default_cors_origins(),
            chat_rate_limit: default_chat_rate_limit(),
        }
    }
}

/// Router behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSettings {
    /// Per-call timeout applied to every oracle call.
    #[serde(default = "default_oracle_timeout_secs")]
    pub oracle_timeout_secs: u64,

    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Sessions inactive longer than this are pruned from memory.
    #[serde(default = "default_session_idle_timeout")]
    pub session_idle_timeout_secs: u64,
}

fn default_oracle_timeout_secs() -> u64 {
    30
}

fn default_command_prefix() -> String {
    "/".to_string()
}

fn default_session_idle_timeout() -> u64 {
    7 * 24 * 3600 // 7 days
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            oracle_timeout_secs: default_oracle_timeout_secs(),
            command_prefix: default_command_prefix(),
            session_idle_timeout_secs: default_session_idle_timeout(),
        }
    }
}

impl Settings {
    /// Default TOML config file path (~/.artemis/config.toml).
    pub fn default_toml_path() -> PathBuf {
        crate::bootstrap::artemis_dir().join("config.toml")
    }

    /// Load settings from a TOML file.
    ///
    /// Returns `None` if the file doesn't exist. Returns an error only
    /// if the file exists but can't be parsed.
    pub fn load_toml(path: &Path) -> Result<Option<Self>, String> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {}", path.display(), e)),
        };

        let settings: Self = toml::from_str(&data)
            .map_err(|e| format!("invalid TOML in {}: {}", path.display(), e))?;
        Ok(Some(settings))
    }

    /// Write a commented TOML config file with current settings.
    pub fn save_toml(&self, path: &Path) -> Result<(), String> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| format!("failed to serialize settings: {}", e))?;

        let content = format!(
            "# Artemis configuration file.\n\
             #\n\
             # Priority: env var > this file > defaults.\n\
             # GEMINI_API_KEY is read from the environment only.\n\
             \n\
             {raw}"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
        }
        std::fs::write(path, content).map_err(|e| format!("failed to write {}: {}", path.display(), e))
    }
}
