//! Completion provider module for chatsdj
//!
//! This module contains the completion client abstraction, the server-sent
//! event decoder, and the OpenAI-compatible implementation.

pub mod base;
pub mod openai;
pub mod sse;

pub use base::{
    CompletionClient, FunctionDefinition, GeneratedImage, Message, Role, StreamingHandler,
    StreamingResponse, ToolDefinition, ToolInvocation,
};
pub use openai::OpenAIClient;

use crate::config::OpenAIConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a completion client from configuration
///
/// # Arguments
///
/// * `config` - OpenAI configuration
///
/// # Returns
///
/// Returns a shareable completion client
///
/// # Errors
///
/// Returns error if client initialization fails
pub fn create_client(config: &OpenAIConfig) -> Result<Arc<dyn CompletionClient>> {
    Ok(Arc::new(OpenAIClient::new(config.clone())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client() {
        let config = OpenAIConfig {
            api_key: "sk-test".to_string(),
            ..Default::default()
        };
        assert!(create_client(&config).is_ok());
    }
}
