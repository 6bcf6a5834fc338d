//! Webhook server command for chatsdj

use crate::agent::Counsellor;
use crate::config::Config;
use crate::error::Result;
use crate::server::{self, AppState};
use crate::slack::SlackWebClient;
use crate::{persona, providers};
use std::sync::Arc;

/// Builds the counsellor from configuration
///
/// # Errors
///
/// Returns error if any client cannot be created
pub fn build_counsellor(config: Arc<Config>) -> Result<Counsellor> {
    let slack = Arc::new(SlackWebClient::new(&config.slack)?);
    let completion = providers::create_client(&config.openai)?;
    let personas = persona::create_source(&config.google)?;

    if personas.is_none() {
        tracing::info!("No persona spreadsheet configured; using the default persona");
    }

    Ok(Counsellor::new(slack, completion, personas, config))
}

/// Validates configuration and serves Slack events
///
/// # Errors
///
/// Returns error if configuration is incomplete or the server fails
pub async fn run_serve(config: Config) -> Result<()> {
    config.validate_server()?;

    let listen_addr = config.server.listen_addr.clone();
    let signing_secret = config.slack.signing_secret.clone();
    let counsellor = build_counsellor(Arc::new(config))?;

    server::serve(&listen_addr, AppState::new(Arc::new(counsellor), signing_secret)).await
}
