//! Type definitions for the research workflow
//!
//! The [`Session`] is the whole state of one run. It is a plain value: the
//! state machine consumes it together with an [`Event`] and hands back the
//! next session plus an [`Effect`] for the caller to carry out.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::WorkflowError;

/// A step of the guided workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Collect topic, goal and existing data
    #[default]
    InputDetails,

    /// Walk through the generated ideas one at a time
    ReviewIdeas,

    /// Summary of the literature around the approved idea
    LiteratureSummary,

    /// Predicted properties or experimental approach
    PropertiesPrediction,

    /// Compiled proposal overview
    FinalCompilation,
}

impl Stage {
    /// 1-based position in the pipeline
    pub fn number(self) -> usize {
        match self {
            Stage::InputDetails => 1,
            Stage::ReviewIdeas => 2,
            Stage::LiteratureSummary => 3,
            Stage::PropertiesPrediction => 4,
            Stage::FinalCompilation => 5,
        }
    }

    /// Human readable title of the stage
    pub fn title(self) -> &'static str {
        match self {
            Stage::InputDetails => "Provide Research Details",
            Stage::ReviewIdeas => "Review Research Ideas",
            Stage::LiteratureSummary => "Literature Summary",
            Stage::PropertiesPrediction => "Predict Properties / Experimental Approach",
            Stage::FinalCompilation => "Final Research Proposal Overview",
        }
    }

    /// The generation whose result this stage displays, if any
    pub fn generation(self) -> Option<GenerationKind> {
        match self {
            Stage::InputDetails => Some(GenerationKind::Ideas),
            Stage::ReviewIdeas => None,
            Stage::LiteratureSummary => Some(GenerationKind::LiteratureSummary),
            Stage::PropertiesPrediction => Some(GenerationKind::Properties),
            Stage::FinalCompilation => Some(GenerationKind::FinalResponse),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::InputDetails => write!(f, "input details"),
            Stage::ReviewIdeas => write!(f, "review ideas"),
            Stage::LiteratureSummary => write!(f, "literature summary"),
            Stage::PropertiesPrediction => write!(f, "properties prediction"),
            Stage::FinalCompilation => write!(f, "final compilation"),
        }
    }
}

/// Which AI output a generation request produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Ideas,
    LiteratureSummary,
    Properties,
    FinalResponse,
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GenerationKind::Ideas => write!(f, "research ideas"),
            GenerationKind::LiteratureSummary => write!(f, "literature summary"),
            GenerationKind::Properties => write!(f, "properties"),
            GenerationKind::FinalResponse => write!(f, "final response"),
        }
    }
}

/// The free-text inputs collected at the first stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchInput {
    pub topic: String,
    pub goal: String,
    pub data: String,
}

impl ResearchInput {
    pub fn new(
        topic: impl Into<String>,
        goal: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            goal: goal.into(),
            data: data.into(),
        }
    }

    /// Names of the fields that are empty or whitespace only
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("topic", &self.topic),
            ("goal", &self.goal),
            ("data", &self.data),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// All data of one workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Identifies the run in logs; new on every reset
    pub id: Uuid,

    pub stage: Stage,

    /// Set on submission, kept until reset
    pub input: Option<ResearchInput>,

    /// Candidate ideas, replaced wholesale on regeneration
    pub ideas: Vec<String>,

    /// Cursor into `ideas`
    pub idea_index: usize,

    pub approved_idea: Option<String>,

    pub literature_summary: Option<String>,

    pub properties: Option<String>,

    pub final_response: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh session at the first stage
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::InputDetails,
            input: None,
            ideas: Vec::new(),
            idea_index: 0,
            approved_idea: None,
            literature_summary: None,
            properties: None,
            final_response: None,
        }
    }

    /// The idea under the cursor, while it is in bounds
    pub fn current_idea(&self) -> Option<&str> {
        self.ideas.get(self.idea_index).map(String::as_str)
    }

    /// Cached output for a generation kind
    pub fn output(&self, kind: GenerationKind) -> Option<&str> {
        match kind {
            // Ideas are consumed into the list; there is no single cached text
            GenerationKind::Ideas => None,
            GenerationKind::LiteratureSummary => self.literature_summary.as_deref(),
            GenerationKind::Properties => self.properties.as_deref(),
            GenerationKind::FinalResponse => self.final_response.as_deref(),
        }
    }

    /// Whether the current stage has the output it displays
    pub fn stage_output_ready(&self) -> bool {
        match self.stage {
            Stage::InputDetails => !self.ideas.is_empty(),
            Stage::ReviewIdeas => self.current_idea().is_some(),
            Stage::LiteratureSummary => self.literature_summary.is_some(),
            Stage::PropertiesPrediction => self.properties.is_some(),
            Stage::FinalCompilation => self.final_response.is_some(),
        }
    }

    /// Check the structural invariants of the session.
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.stage == Stage::ReviewIdeas && self.idea_index >= self.ideas.len() {
            return Err(format!(
                "idea_index {} out of bounds for {} ideas at review stage",
                self.idea_index,
                self.ideas.len()
            ));
        }
        if self.literature_summary.is_some() && self.approved_idea.is_none() {
            return Err("literature summary present without an approved idea".to_string());
        }
        if self.properties.is_some() && self.literature_summary.is_none() {
            return Err("properties present without a literature summary".to_string());
        }
        if self.final_response.is_some() && self.properties.is_none() {
            return Err("final response present without properties".to_string());
        }
        Ok(())
    }
}

/// User actions and generator results fed into the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Submit the research details
    Submit(ResearchInput),

    /// Approve the output of the current stage
    Approve,

    /// Reject the output of the current stage
    Reject,

    /// (Re-)enter the current stage; generates its output when missing
    Enter,

    /// Discard the session and start over
    StartNew,

    /// A generation finished
    Generated { kind: GenerationKind, text: String },

    /// A generation failed
    GenerationFailed { kind: GenerationKind, reason: String },
}

impl Event {
    /// Short name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::Submit(_) => "submit",
            Event::Approve => "approve",
            Event::Reject => "reject",
            Event::Enter => "enter",
            Event::StartNew => "start new",
            Event::Generated { .. } => "generated",
            Event::GenerationFailed { .. } => "generation failed",
        }
    }
}

/// A prompt that has to be sent to the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    pub prompt: String,
}

/// What the caller has to do after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Nothing; render the new session
    None,

    /// Call the generator and feed the result back as an event
    Generate(GenerationRequest),

    /// Show a recoverable error to the user
    Report(WorkflowError),
}
