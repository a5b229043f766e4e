//! Command-line interface definition and argument parsing
//!
//! This module uses clap to define and parse command-line arguments.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the research agent
#[derive(Parser, Debug)]
#[command(
    name = "research-agent",
    about = "AI research agent for chemists",
    version,
    long_about = "Guides a research question from topic and goal through idea review, literature summary and property prediction to a proposal overview, with an approval gate at every step."
)]
pub struct Cli {
    /// The model to use for generation
    #[arg(long)]
    pub model: Option<String>,

    /// Directory where exported PDFs are written
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Maximum tokens per generated response
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Override the provider endpoint
    #[arg(long, hide = true)]
    pub api_base_url: Option<String>,

    /// Log filter (e.g. "info", "research_agent=debug")
    #[arg(long)]
    pub log: Option<String>,

    /// Research topic (skips the interactive prompt)
    #[arg(long)]
    pub topic: Option<String>,

    /// Research goal (skips the interactive prompt)
    #[arg(long)]
    pub goal: Option<String>,

    /// Data already available (skips the interactive prompt)
    #[arg(long)]
    pub data: Option<String>,
}

/// Overlay the parsed flags on an environment-derived configuration
pub fn cli_to_config(cli: &Cli, mut config: crate::config::Config) -> crate::config::Config {
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.generation.max_output_tokens = max_tokens;
    }
    if let Some(temperature) = cli.temperature {
        config.generation.temperature = temperature;
    }
    if let Some(url) = &cli.api_base_url {
        config.api_base_url = Some(url.clone());
    }
    if let Some(level) = &cli.log {
        config.log_level = level.clone();
    }

    config
}
