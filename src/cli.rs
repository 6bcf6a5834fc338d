//! Command-line interface definition for chatsdj
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for serving Slack webhooks, listing models,
//! and preparing persona source credentials.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chatsdj - Slack counsellor bot
///
/// Relays Slack mentions to a streaming LLM completion API, answering
/// as a persona picked from a spreadsheet.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatsdj")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for chatsdj
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the Slack Events API webhook
    Serve {
        /// Socket address to bind (overrides config and CHATSDJ_LISTEN_ADDR)
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// List models available from the completion API
    Models {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a service account JSON file as the base64 value expected in
    /// GOOGLE_CREDENTIALS
    EncodeCredentials {
        /// Path to the service account JSON file
        path: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            command: Commands::Serve { listen: None },
        }
    }
}
