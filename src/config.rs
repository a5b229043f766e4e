//! Configuration for the research agent
//!
//! Values are layered: built-in defaults, then the environment (including a
//! `.env` file loaded by `main`), then command-line flags.

use crate::constants::{DEFAULT_MODEL, ENV_API_KEYS, ENV_LOG, ENV_MODEL, ENV_OUTPUT_DIR};
use crate::llm::GenerationSettings;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Application configuration structure
#[derive(Clone)]
pub struct Config {
    /// Model name to use (will infer provider from this)
    pub model: String,

    /// API key for the model provider
    pub api_key: Option<String>,

    /// Override for the provider endpoint
    pub api_base_url: Option<String>,

    /// Sampling parameters passed to the provider
    pub generation: GenerationSettings,

    /// Directory where exported PDFs are written
    pub output_dir: PathBuf,

    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_base_url: None,
            generation: GenerationSettings::default(),
            output_dir: PathBuf::from("."),
            log_level: "warn".to_string(),
        }
    }

    /// Defaults overlaid with environment variables
    pub fn from_env() -> Self {
        let mut config = Self::new();

        config.api_key = ENV_API_KEYS
            .iter()
            .find_map(|name| env::var(name).ok())
            .filter(|key| !key.trim().is_empty());

        if let Ok(model) = env::var(ENV_MODEL) {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        if let Ok(dir) = env::var(ENV_OUTPUT_DIR) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Ok(level) = env::var(ENV_LOG) {
            config.log_level = level;
        }

        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

// Keep the API key out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("generation", &self.generation)
            .field("output_dir", &self.output_dir)
            .field("log_level", &self.log_level)
            .finish()
    }
}
