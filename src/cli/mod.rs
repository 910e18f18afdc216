//! Command-line interface.
//!
//! `artemis serve` runs the HTTP gateway, `artemis repl` a terminal chat and
//! `artemis doctor` the diagnostics.

pub mod doctor;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::agent::{Router, SessionManager};
use crate::attestation::VtpmClient;
use crate::chain::FlareClient;
use crate::channels::web::{GatewayState, start_server};
use crate::channels::ReplChannel;
use crate::config::Config;
use crate::llm::GeminiProvider;

/// Upper bound on how often idle gateway sessions are swept.
const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "artemis")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level or filter directive; RUST_LOG takes precedence
    #[arg(long, global = true, env = "ARTEMIS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[arg(long, global = true, env = "ARTEMIS_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP chat gateway.
    Serve {
        /// Host to bind to (overrides GATEWAY_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides GATEWAY_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the agent in the terminal.
    Repl {
        /// Send a single message and exit
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Probe configuration and external services.
    Doctor {
        /// Exit non-zero if any check fails
        #[arg(long)]
        strict: bool,
    },
}

/// Build the message router from resolved configuration.
pub fn build_router(config: &Config) -> anyhow::Result<Router> {
    let llm = GeminiProvider::from_config(&config.llm)
        .context("cannot start without a completion provider")?;
    let chain = FlareClient::new(&config.chain);
    let attestation = VtpmClient::new(&config.attestation);
    if attestation.is_simulated() {
        tracing::warn!("Attestation is simulated; tokens are not backed by a TEE");
    }

    tracing::info!(
        model = %config.llm.model,
        rpc_url = %chain.rpc_url(),
        "Router configured"
    );
    Ok(Router::new(
        Arc::new(llm),
        Arc::new(chain),
        Arc::new(attestation),
        config.agent.clone(),
    ))
}

pub async fn run_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let router = Arc::new(build_router(&config)?);
    let sessions = Arc::new(
        SessionManager::new().with_idle_timeout(config.agent.session_idle_timeout),
    );
    let pruner = sessions.spawn_idle_pruner(
        config
            .agent
            .session_idle_timeout
            .min(SESSION_PRUNE_INTERVAL),
    );
    let state = Arc::new(GatewayState::new(router, sessions, &config.gateway));

    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address {}:{}",
                config.gateway.host, config.gateway.port
            )
        })?;
    let bound = start_server(addr, Arc::clone(&state), &config.gateway).await?;
    tracing::info!(
        "Chat endpoint: http://{}/api/{}/chat/",
        bound,
        config.gateway.api_version
    );

    shutdown_signal().await;
    pruner.abort();
    state.shutdown().await;
    Ok(())
}

pub async fn run_repl(config: Config, message: Option<String>) -> anyhow::Result<()> {
    let router = Arc::new(build_router(&config)?);
    let repl = match message {
        Some(message) => ReplChannel::with_message(router, message),
        None => ReplChannel::new(router),
    };
    repl.run().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::parse_from(["artemis", "serve", "--port", "9000"]);
        assert!(matches!(
            cli.command,
            Command::Serve {
                host: None,
                port: Some(9000)
            }
        ));

        let cli = Cli::parse_from(["artemis", "repl", "-m", "hello"]);
        assert!(matches!(cli.command, Command::Repl { message: Some(ref m) } if m == "hello"));

        let cli = Cli::parse_from(["artemis", "doctor", "--strict"]);
        assert!(matches!(cli.command, Command::Doctor { strict: true }));
    }
}
