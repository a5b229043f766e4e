//! LLM backend factory
//!
//! Creates the generator for a configuration, inferring the provider from
//! the model name.

use crate::config::Config;
use crate::llm::gemini::GeminiBackend;
use crate::llm::{Generator, LlmError};

/// Supported model provider types
#[derive(Debug, PartialEq, Eq)]
pub enum Provider {
    /// Google's Gemini models
    Google,
    /// Unknown provider
    Unknown(String),
}

/// Model information after parsing
#[derive(Debug, PartialEq, Eq)]
struct ModelInfo {
    /// The provider to use
    provider: Provider,
    /// The actual model name to pass to the API
    model_name: String,
}

/// Create a generator from configuration, inferring the provider from model name
pub fn create_generator(config: &Config) -> Result<Box<dyn Generator>, LlmError> {
    let model_info = parse_model_string(&config.model);

    match model_info.provider {
        Provider::Google => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                LlmError::ConfigError(
                    "GOOGLE_API_KEY (or GEMINI_API_KEY) environment variable not set".into(),
                )
            })?;
            let backend = match &config.api_base_url {
                Some(url) => GeminiBackend::with_base_url(api_key, model_info.model_name, url.clone())?,
                None => GeminiBackend::new(api_key, model_info.model_name)?,
            };
            Ok(Box::new(backend.with_settings(config.generation.clone())))
        }
        Provider::Unknown(name) if name.is_empty() => Err(LlmError::ConfigError(format!(
            "Cannot infer a provider for model '{}'. Use a gemini-* model or the google/ prefix.",
            config.model
        ))),
        Provider::Unknown(name) => Err(LlmError::ConfigError(format!(
            "Unsupported provider '{}'",
            name
        ))),
    }
}

/// Parse a model string which may be in either format:
/// - "gemini-1.5-flash" (provider inferred from model name)
/// - "google/gemini-1.5-flash" (explicit provider)
fn parse_model_string(model_str: &str) -> ModelInfo {
    if let Some((provider, model)) = model_str.split_once('/') {
        let provider_type = match provider.trim().to_lowercase().as_str() {
            "google" | "gemini" => Provider::Google,
            other => Provider::Unknown(other.to_string()),
        };

        return ModelInfo {
            provider: provider_type,
            model_name: model.trim().to_string(),
        };
    }

    let provider = if is_gemini_model(model_str) {
        Provider::Google
    } else {
        Provider::Unknown(String::new())
    };

    ModelInfo {
        provider,
        model_name: model_str.trim().to_string(),
    }
}

fn is_gemini_model(model: &str) -> bool {
    let model = model.trim().to_lowercase();
    model.starts_with("gemini") || model.starts_with("learnlm")
}
