//! Error types for workflow operations

use super::types::{GenerationKind, Stage};

/// Recoverable errors surfaced by the state machine.
///
/// None of these are fatal: the session is always left in a valid stage and
/// the user can resubmit, retry or move back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("Please fill in all fields to generate research ideas (missing: {})", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    #[error("Failed to generate {kind}: {reason}")]
    Generation { kind: GenerationKind, reason: String },

    #[error("No more ideas to review. Please go back to generate new ideas.")]
    ExhaustedIdeas,

    #[error("Nothing to approve yet: the {0} output has not been generated")]
    OutputPending(Stage),

    #[error("'{event}' is not accepted at the {stage} stage")]
    UnexpectedEvent { stage: Stage, event: &'static str },
}
