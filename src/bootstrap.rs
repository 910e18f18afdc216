//! Bootstrap helpers for Artemis.
//!
//! Env vars can be kept in `~/.artemis/.env` so that the Gemini key and RPC
//! endpoints survive across shells. The standard `./.env` is loaded first.
//!
//! File: `~/.artemis/.env` (standard dotenvy format)

use std::path::{Path, PathBuf};

/// Base directory for Artemis state: `~/.artemis`.
pub fn artemis_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".artemis")
}

/// Path to the Artemis-specific `.env` file: `~/.artemis/.env`.
pub fn artemis_env_path() -> PathBuf {
    artemis_dir().join(".env")
}

/// Load `./.env` and then `~/.artemis/.env`.
///
/// dotenvy never overwrites existing env vars, so the effective priority is:
///
///   explicit env vars > `./.env` > `~/.artemis/.env`
pub fn load_artemis_env() {
    let _ = dotenvy::dotenv();
    load_env_file(&artemis_env_path());
}

/// Load a single dotenv file if it exists. Returns whether anything was loaded.
pub fn load_env_file(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match dotenvy::from_path(path) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Warning: failed to load {}: {}", path.display(), e);
            false
        }
    }
}
