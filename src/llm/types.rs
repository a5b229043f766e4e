//! Common types for LLM interactions

use serde::Deserialize;

/// Response from an LLM provider
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    /// Concatenated text of the response
    pub text: String,

    /// Usage statistics, if available
    pub usage: Option<TokenUsage>,

    /// The reason the response was stopped (e.g., "STOP", "MAX_TOKENS")
    pub stop_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TokenUsage {
    /// Input tokens for the current request
    pub input_tokens: usize,

    /// Output tokens for the current request
    pub output_tokens: usize,
}

/// Sampling parameters shared by all providers
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    /// Maximum tokens to generate in the response
    pub max_output_tokens: u32,

    pub temperature: f32,

    pub top_p: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_output_tokens: 8192,
            temperature: 0.5,
            top_p: 0.95,
        }
    }
}
