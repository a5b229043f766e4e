//! LLM provider abstraction layer
//!
//! The workflow only needs one capability from a model: turn a prompt into
//! text. This module defines that [`Generator`] trait, the error type shared
//! by all providers, and the concrete Gemini backend.

pub use async_trait::async_trait;

pub mod factory;
pub mod gemini;
mod types;

pub use self::factory::create_generator;
pub use self::types::*;

use crate::constants::ERROR_MARKER;

/// Text-generation capability consumed by the workflow
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the model name
    fn model(&self) -> &str;
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Box<G> {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).generate(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

/// Error types for LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The provider answered with an error status or refused the prompt
    #[error("API error: {0}")]
    ApiError(String),

    /// Missing key, unknown provider and similar setup problems
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Transport failure before any answer arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The answer did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response text carried the error marker
    #[error("{0}")]
    Marked(String),
}

/// Turn a text that carries [`ERROR_MARKER`] into an error.
///
/// Some transports report failures in-band; everything downstream of the
/// generator only deals with `Result`.
pub fn check_error_marker(text: String) -> Result<String, LlmError> {
    if text.contains(ERROR_MARKER) {
        Err(LlmError::Marked(text.trim().to_string()))
    } else {
        Ok(text)
    }
}
