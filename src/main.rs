use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use artemis::cli::{Cli, Command, doctor};
use artemis::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    artemis::bootstrap::load_artemis_env();
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Command::Doctor { strict } => doctor::run_doctor_command(strict).await,
        Command::Serve { host, port } => {
            let config = Config::from_env()?;
            artemis::cli::run_serve(config, host, port).await
        }
        Command::Repl { message } => {
            let config = Config::from_env()?;
            artemis::cli::run_repl(config, message).await
        }
    }
}

/// Logs go to stderr so REPL replies on stdout stay clean.
fn init_logging(level: &str, format: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    match format {
        "json" => subscriber
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init(),
        _ => subscriber
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
    }
}
