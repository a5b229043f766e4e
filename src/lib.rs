//! research-agent: AI research assistant for chemists
//!
//! A guided workflow that takes a research topic, goal and available data
//! through idea review, a literature summary and property prediction to a
//! proposal overview, asking for approval at every step. The workflow rules
//! live in [`workflow`]; text generation is behind [`llm::Generator`].

#[macro_use]
pub mod macros;

pub mod cli;
pub mod config;
pub mod constants;
pub mod export;
pub mod llm;
pub mod prompts;
pub mod ui_interface;
pub mod workflow;
