//! Configuration management for chatsdj
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Every component receives its section of [`Config`] explicitly; nothing
//! reads the process environment after [`Config::load`] returns.

use crate::error::{ChatsdjError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for chatsdj
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion API settings
    #[serde(default)]
    pub openai: OpenAIConfig,
    /// Slack Web API and webhook settings
    #[serde(default)]
    pub slack: SlackConfig,
    /// Persona spreadsheet settings
    #[serde(default)]
    pub google: GoogleConfig,
    /// User-facing message templates
    #[serde(default)]
    pub messages: MessagesConfig,
    /// Webhook server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Completion API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Bearer token for the completion API
    #[serde(default)]
    pub api_key: String,

    /// Base URL for the API (useful for tests and compatible gateways)
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    /// Model used when the persona does not request one, or requests one
    /// that is not deployed
    #[serde(default = "default_openai_model")]
    pub default_model: String,

    /// Model used for the image generation tool
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Optional completion token cap sent with every request
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Per-request timeout (seconds)
    #[serde(default = "default_openai_timeout")]
    pub timeout_seconds: u64,
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_openai_timeout() -> u64 {
    120
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_openai_api_base(),
            default_model: default_openai_model(),
            image_model: default_image_model(),
            max_tokens: None,
            timeout_seconds: default_openai_timeout(),
        }
    }
}

/// Slack configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token used for Web API calls
    #[serde(default)]
    pub api_token: String,

    /// Signing secret used to verify inbound webhook requests
    #[serde(default)]
    pub signing_secret: String,

    /// Base URL for the Web API (tests point this at a mock server)
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".to_string()
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            signing_secret: String::new(),
            api_base: default_slack_api_base(),
        }
    }
}

/// Google Sheets persona source configuration
///
/// The persona source is enabled only when `spreadsheet_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// Base64 encoded service account JSON
    #[serde(default)]
    pub credentials: Option<String>,

    /// Spreadsheet holding `name | emoji | prompt | model` rows
    #[serde(default)]
    pub spreadsheet_id: Option<String>,

    /// A1 range to read (header row excluded)
    #[serde(default = "default_sheet_range")]
    pub range: String,

    /// OAuth token endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Sheets API base URL
    #[serde(default = "default_sheets_api_base")]
    pub sheets_api_base: String,
}

fn default_sheet_range() -> String {
    "A2:D".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_sheets_api_base() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            spreadsheet_id: None,
            range: default_sheet_range(),
            token_url: default_token_url(),
            sheets_api_base: default_sheets_api_base(),
        }
    }
}

/// Message templates shown in Slack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    /// Text of the draft message posted before streaming starts
    #[serde(default = "default_initial_message")]
    pub initial_message: String,

    /// Suffix appended to in-progress text updates
    #[serde(default = "default_loading_sign")]
    pub loading_sign: String,

    /// Apology shown when a turn fails
    #[serde(default = "default_error_message")]
    pub error_message: String,

    /// Draft text while an image is being generated
    #[serde(default = "default_image_generation_loading_message")]
    pub image_generation_loading_message: String,

    /// Emoji of the built-in counsellor
    #[serde(default = "default_counsellor_emoji")]
    pub default_counsellor_emoji: String,
}

fn default_initial_message() -> String {
    ".:thought_balloon:".to_string()
}

fn default_loading_sign() -> String {
    "...:writing_hand:".to_string()
}

fn default_error_message() -> String {
    "エラーが発生してもうたんや…".to_string()
}

fn default_image_generation_loading_message() -> String {
    "画像生成中...:art:".to_string()
}

fn default_counsellor_emoji() -> String {
    "egg".to_string()
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            initial_message: default_initial_message(),
            loading_sign: default_loading_sign(),
            error_message: default_error_message(),
            image_generation_loading_message: default_image_generation_loading_message(),
            default_counsellor_emoji: default_counsellor_emoji(),
        }
    }
}

/// Webhook server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the webhook server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatsdjError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatsdjError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            self.openai.api_key = api_key;
        }

        if let Ok(api_base) = std::env::var("OPENAI_API_BASE") {
            self.openai.api_base = api_base;
        }

        if let Ok(model) = std::env::var("OPENAI_DEFAULT_MODEL") {
            if !model.is_empty() {
                self.openai.default_model = model;
            }
        }

        if let Ok(model) = std::env::var("OPENAI_IMAGE_MODEL") {
            if !model.is_empty() {
                self.openai.image_model = model;
            }
        }

        if let Ok(token) = std::env::var("SLACK_API_TOKEN") {
            self.slack.api_token = token;
        }

        if let Ok(secret) = std::env::var("SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = secret;
        }

        if let Ok(credentials) = std::env::var("GOOGLE_CREDENTIALS") {
            self.google.credentials = Some(credentials).filter(|c| !c.is_empty());
        }

        if let Ok(spreadsheet_id) = std::env::var("GOOGLE_SPREADSHEET_ID") {
            self.google.spreadsheet_id = Some(spreadsheet_id).filter(|s| !s.is_empty());
        }

        // Message templates: an empty value keeps the default.
        let templates: [(&str, &mut String); 5] = [
            (
                "CHATSDJ_INITIAL_MESSAGE",
                &mut self.messages.initial_message,
            ),
            ("CHATSDJ_LOADING_SIGN", &mut self.messages.loading_sign),
            ("CHATSDJ_ERROR_MESSAGE", &mut self.messages.error_message),
            (
                "CHATSDJ_IMAGE_GENERATION_LOADING_MESSAGE",
                &mut self.messages.image_generation_loading_message,
            ),
            (
                "CHATSDJ_DEFAULT_COUNSELLOR_EMOJI",
                &mut self.messages.default_counsellor_emoji,
            ),
        ];
        for (name, slot) in templates {
            if let Ok(value) = std::env::var(name) {
                if !value.is_empty() {
                    tracing::debug!("Env override: {}", name);
                    *slot = value;
                }
            }
        }

        if let Ok(addr) = std::env::var("CHATSDJ_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let crate::cli::Commands::Serve {
            listen: Some(addr),
        } = &cli.command
        {
            tracing::debug!(listen = %addr, "CLI override: listen address");
            self.server.listen_addr = addr.clone();
        }
    }

    /// Validate the configuration needed to talk to the completion API
    ///
    /// # Errors
    ///
    /// Returns error if the API key or default model is missing, or
    /// numeric settings are out of range
    pub fn validate(&self) -> Result<()> {
        if self.openai.api_key.is_empty() {
            return Err(ChatsdjError::Config("OPENAI_API_KEY is not set".to_string()).into());
        }

        if self.openai.default_model.is_empty() {
            return Err(
                ChatsdjError::Config("openai.default_model cannot be empty".to_string()).into(),
            );
        }

        if self.openai.timeout_seconds == 0 {
            return Err(ChatsdjError::Config(
                "openai.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if let Some(0) = self.openai.max_tokens {
            return Err(ChatsdjError::Config(
                "openai.max_tokens must be greater than 0 when set".to_string(),
            )
            .into());
        }

        if self.google.spreadsheet_id.is_some() && self.google.credentials.is_none() {
            return Err(ChatsdjError::Config(
                "GOOGLE_CREDENTIALS is required when GOOGLE_SPREADSHEET_ID is set".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Validate the additional settings required to serve Slack webhooks
    ///
    /// # Errors
    ///
    /// Returns error if the Slack token or signing secret is missing, or
    /// the listen address cannot be parsed
    pub fn validate_server(&self) -> Result<()> {
        self.validate()?;

        if self.slack.api_token.is_empty() {
            return Err(ChatsdjError::Config("SLACK_API_TOKEN is not set".to_string()).into());
        }

        if self.slack.signing_secret.is_empty() {
            return Err(
                ChatsdjError::Config("SLACK_SIGNING_SECRET is not set".to_string()).into(),
            );
        }

        if self
            .server
            .listen_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ChatsdjError::Config(format!(
                "Invalid listen address: {}",
                self.server.listen_addr
            ))
            .into());
        }

        Ok(())
    }
}
