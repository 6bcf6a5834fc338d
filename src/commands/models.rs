//! Model listing command for chatsdj
//!
//! Lists the models deployed on the completion API and marks the configured
//! default, so persona model overrides can be checked before use.

use crate::config::Config;
use crate::error::{ChatsdjError, Result};
use crate::providers::{self, CompletionClient};
use prettytable::{row, Table};
use serde::Serialize;

/// One listed model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    /// Model identifier
    pub id: String,
    /// Whether this is the configured default model
    pub default: bool,
}

/// List available models from the completion API
///
/// # Arguments
///
/// * `config` - Configuration containing the API settings
/// * `json` - Print JSON instead of a table
///
/// # Errors
///
/// Returns error if the client cannot be created or the listing fails
///
/// # Examples
///
/// ```no_run
/// use chatsdj::config::Config;
/// use chatsdj::commands::models::list_models;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load("config/config.yaml", &Default::default())?;
/// list_models(&config, false).await?;
/// # Ok(())
/// # }
/// ```
pub async fn list_models(config: &Config, json: bool) -> Result<()> {
    tracing::info!("Listing models from {}", config.openai.api_base);

    let client = providers::create_client(&config.openai)?;
    let entries = collect_models(client.as_ref(), &config.openai.default_model).await?;

    if json {
        println!("{}", render_json(&entries)?);
    } else {
        output_models_table(&entries);
    }
    Ok(())
}

/// Fetches model ids, sorted, with the default marked
///
/// # Errors
///
/// Returns error if the listing fails
pub async fn collect_models(
    client: &dyn CompletionClient,
    default_model: &str,
) -> Result<Vec<ModelEntry>> {
    let mut ids = client.list_models().await?;
    ids.sort();

    if !ids.iter().any(|id| id == default_model) {
        tracing::warn!(
            "Default model {} is not listed by the API",
            default_model
        );
    }

    Ok(ids
        .into_iter()
        .map(|id| ModelEntry {
            default: id == default_model,
            id,
        })
        .collect())
}

/// Renders model entries as pretty JSON
///
/// # Errors
///
/// Returns `ChatsdjError::Serialization` if serialization fails
pub fn render_json(entries: &[ModelEntry]) -> Result<String> {
    serde_json::to_string_pretty(entries).map_err(|e| ChatsdjError::Serialization(e).into())
}

fn output_models_table(entries: &[ModelEntry]) {
    let mut table = Table::new();
    table.add_row(row!["Model", "Default"]);
    for entry in entries {
        table.add_row(row![entry.id, if entry.default { "*" } else { "" }]);
    }

    println!("\nAvailable models:\n");
    table.printstd();
    println!();
}
