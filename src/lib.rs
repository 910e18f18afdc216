//! Artemis: a conversational agent for Flare.
//!
//! Messages are routed to commands, pending confirmations, attestation nonce
//! answers or intent handlers backed by three oracles: a completion model, an
//! EVM chain and a TEE attestation service.

pub mod agent;
pub mod attestation;
pub mod bootstrap;
pub mod chain;
pub mod channels;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod prompts;
pub mod settings;

pub use crate::agent::{Router, SessionManager};
pub use crate::config::Config;
pub use crate::error::{Error, Result};
