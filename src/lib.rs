//! chatsdj - Slack counsellor bot library
//!
//! This library relays Slack `app_mention` events to a streaming chat
//! completion API and answers in the thread as a persona, editing a draft
//! message as the completion streams in.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `agent`: Turn orchestration, thread history reconstruction, draft replies
//! - `providers`: Completion API abstraction, SSE decoding, OpenAI client
//! - `slack`: Slack Web API client, event payloads, request verification
//! - `persona`: Persona records and the Google Sheets persona source
//! - `server`: Events API webhook
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use chatsdj::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate_server()?;
//!     chatsdj::commands::serve::run_serve(config).await
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod persona;
pub mod providers;
pub mod server;
pub mod slack;

// Re-export commonly used types
pub use agent::Counsellor;
pub use config::Config;
pub use error::{ChatsdjError, Result};
pub use persona::Persona;

#[cfg(test)]
pub mod test_utils;
