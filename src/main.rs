//! chatsdj - Slack counsellor bot
//!
#![doc = "Main entry point for the chatsdj webhook server and tooling."]

use anyhow::Result;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatsdj::cli::{Cli, Commands};
use chatsdj::commands;
use chatsdj::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::EncodeCredentials { ref path } => {
            tracing::debug!("Encoding credentials from {}", path.display());
            println!("{}", commands::credentials::encode_credentials(path)?);
            Ok(())
        }
        Commands::Models { json } => {
            let config = load_config(&cli)?;
            config.validate()?;
            commands::models::list_models(&config, json).await
        }
        Commands::Serve { .. } => {
            tracing::info!("Starting Slack webhook server");
            let config = load_config(&cli)?;
            commands::serve::run_serve(config).await
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    Config::load(config_path, cli)
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool, json_logs: bool) {
    let default_directive = if verbose { "chatsdj=debug" } else { "chatsdj=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
