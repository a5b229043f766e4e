//! Prompt templates for every generating stage
//!
//! Templates live in the `prompts/` directory as Handlebars files and are
//! embedded at compile time. The first line of each file is a `{{! ... }}`
//! comment describing what the template asks the model for.

use handlebars::{no_escape, Handlebars};
use lazy_static::lazy_static;
use serde::Serialize;
use thiserror::Error;

use crate::workflow::ResearchInput;

/// Errors that can occur with templates
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Template rendering error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Invalid template format: {0}")]
    InvalidFormat(#[from] handlebars::TemplateError),

    #[error("Template '{0}' not found")]
    TemplateNotFound(String),
}

pub const IDEAS: &str = "ideas";
pub const LITERATURE_SUMMARY: &str = "literature_summary";
pub const PROPERTIES: &str = "properties";
pub const FINAL_RESPONSE: &str = "final_response";

/// Embedded template sources, by name
const TEMPLATES: [(&str, &str); 4] = [
    (IDEAS, include_str!("../../prompts/ideas.hbs")),
    (
        LITERATURE_SUMMARY,
        include_str!("../../prompts/literature_summary.hbs"),
    ),
    (PROPERTIES, include_str!("../../prompts/properties.hbs")),
    (FINAL_RESPONSE, include_str!("../../prompts/final_response.hbs")),
];

lazy_static! {
    static ref TEMPLATE_MANAGER: TemplateManager =
        TemplateManager::new().expect("embedded prompt templates must compile");
}

/// Registry of the embedded prompt templates
pub struct TemplateManager {
    handlebars: Handlebars<'static>,
}

impl TemplateManager {
    /// Compile all embedded templates
    pub fn new() -> Result<Self, PromptError> {
        let mut handlebars = Handlebars::new();
        // Prompts are plain text; HTML escaping would mangle "&" and quotes
        handlebars.register_escape_fn(no_escape);
        handlebars.set_strict_mode(true);

        for (name, source) in TEMPLATES {
            handlebars.register_template_string(name, source)?;
        }

        Ok(Self { handlebars })
    }

    /// Render a template by name
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, PromptError> {
        if !self.handlebars.has_template(name) {
            return Err(PromptError::TemplateNotFound(name.to_string()));
        }
        let rendered = self.handlebars.render(name, data)?;
        Ok(rendered.trim().to_string())
    }
}

#[derive(Serialize)]
struct IdeaFields<'a> {
    idea: &'a str,
}

#[derive(Serialize)]
struct FinalFields<'a> {
    idea: &'a str,
    summary: &'a str,
    properties: &'a str,
}

/// Prompt asking for a numbered list of 3-7 research ideas
pub fn ideas_prompt(input: &ResearchInput) -> Result<String, PromptError> {
    TEMPLATE_MANAGER.render(IDEAS, input)
}

/// Prompt asking for a ~200-300 word literature summary of `idea`
pub fn literature_summary_prompt(idea: &str) -> Result<String, PromptError> {
    TEMPLATE_MANAGER.render(LITERATURE_SUMMARY, &IdeaFields { idea })
}

/// Prompt asking for structured property predictions for `idea`
pub fn properties_prompt(idea: &str) -> Result<String, PromptError> {
    TEMPLATE_MANAGER.render(PROPERTIES, &IdeaFields { idea })
}

/// Prompt compiling the approved outputs into an NSDB proposal overview
pub fn final_response_prompt(
    idea: &str,
    summary: &str,
    properties: &str,
) -> Result<String, PromptError> {
    TEMPLATE_MANAGER.render(
        FINAL_RESPONSE,
        &FinalFields {
            idea,
            summary,
            properties,
        },
    )
}
