//! The guided research workflow
//!
//! Five stages, each gated by an approval: research details, idea review,
//! literature summary, properties prediction and the final proposal
//! overview. [`machine::transition`] holds the rules; [`WorkflowRunner`]
//! connects them to a generator.

pub mod error;
pub mod ideas;
pub mod machine;
pub mod runner;
pub mod types;

pub use error::WorkflowError;
pub use ideas::parse_ideas;
pub use machine::transition;
pub use runner::WorkflowRunner;
pub use types::{
    Effect, Event, GenerationKind, GenerationRequest, ResearchInput, Session, Stage,
};
