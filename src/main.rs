//! research-agent - guided research proposals from the terminal
//!
//! Loads configuration, sets up logging, creates the generator backend and
//! hands control to the terminal interface.

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use research_agent::cli::{cli_to_config, Cli};
use research_agent::config::Config;
use research_agent::llm::create_generator;
use research_agent::ui_interface::TerminalInterface;
use research_agent::uprintln;
use research_agent::workflow::{ResearchInput, WorkflowRunner};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = cli_to_config(&cli, Config::from_env());
    init_tracing(&config.log_level);
    debug!(?config, "Loaded configuration");

    ctrlc::set_handler(move || {
        eprintln!("\nOperation interrupted by user");
        std::process::exit(130); // Standard exit code for Ctrl+C termination
    })
    .context("Failed to set Ctrl+C handler")?;

    let generator = match create_generator(&config) {
        Ok(generator) => generator,
        Err(e) => {
            uprintln!(error: "{}", e);
            uprintln!(info: "Set GOOGLE_API_KEY (or GEMINI_API_KEY) in the environment or a .env file");
            return Err(e).context("Failed to create the generator");
        }
    };
    uprintln!(info: "Using {} model {}", generator.name(), generator.model());

    if !atty::is(atty::Stream::Stdin) {
        uprintln!(warn: "Input is not a terminal; reading commands line by line from stdin");
    }

    let stdin = io::stdin();
    let runner = WorkflowRunner::new(generator);
    let mut interface =
        TerminalInterface::new(runner, stdin.lock(), io::stdout(), config.output_dir.clone());
    if let Some(input) = preset_input(&cli) {
        interface = interface.with_research_input(input);
    }

    interface.run().await.context("Terminal I/O failed")?;

    uprintln!("Goodbye.");
    Ok(())
}

/// Research details given on the command line, if any
fn preset_input(cli: &Cli) -> Option<ResearchInput> {
    if cli.topic.is_none() && cli.goal.is_none() && cli.data.is_none() {
        return None;
    }
    // Missing flags become empty fields and are reported by validation
    Some(ResearchInput::new(
        cli.topic.clone().unwrap_or_default(),
        cli.goal.clone().unwrap_or_default(),
        cli.data.clone().unwrap_or_default(),
    ))
}

/// Log to stderr; `RUST_LOG` takes precedence over the configured level
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
