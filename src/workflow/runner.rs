//! Async driver for the state machine
//!
//! The runner owns the session and a [`Generator`]. It feeds user events to
//! [`transition`], carries out every [`Effect::Generate`] by awaiting the
//! generator, and feeds the outcome back until the machine settles.

use std::time::Instant;
use tracing::{info, warn};

use super::error::WorkflowError;
use super::machine::transition;
use super::types::{Effect, Event, GenerationRequest, ResearchInput, Session};
use crate::llm::{check_error_marker, Generator};

/// Drives one research session against a generator
pub struct WorkflowRunner<G> {
    session: Session,
    generator: G,
}

impl<G: Generator> WorkflowRunner<G> {
    /// Create a runner with a fresh session
    pub fn new(generator: G) -> Self {
        Self {
            session: Session::new(),
            generator,
        }
    }

    /// Snapshot of the current session
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Apply an event and run any generation it triggers.
    ///
    /// Errors are recoverable; the session is valid afterwards either way.
    pub async fn dispatch(&mut self, event: Event) -> Result<(), WorkflowError> {
        let mut event = event;
        loop {
            let session = std::mem::take(&mut self.session);
            let (session, effect) = transition(session, event);
            self.session = session;

            match effect {
                Effect::None => return Ok(()),
                Effect::Report(err) => return Err(err),
                Effect::Generate(request) => event = self.generate(request).await,
            }
        }
    }

    /// Submit the research details and generate ideas
    pub async fn submit(&mut self, input: ResearchInput) -> Result<(), WorkflowError> {
        self.dispatch(Event::Submit(input)).await
    }

    pub async fn approve(&mut self) -> Result<(), WorkflowError> {
        self.dispatch(Event::Approve).await
    }

    pub async fn reject(&mut self) -> Result<(), WorkflowError> {
        self.dispatch(Event::Reject).await
    }

    /// Re-enter the current stage, generating its output if it is missing
    pub async fn retry(&mut self) -> Result<(), WorkflowError> {
        self.dispatch(Event::Enter).await
    }

    pub async fn start_new(&mut self) -> Result<(), WorkflowError> {
        self.dispatch(Event::StartNew).await
    }

    /// Call the generator once and turn the outcome into an event
    async fn generate(&self, request: GenerationRequest) -> Event {
        let GenerationRequest { kind, prompt } = request;
        let started = Instant::now();

        let result = self
            .generator
            .generate(&prompt)
            .await
            .and_then(check_error_marker);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(text) => {
                info!(
                    session = %self.session.id,
                    %kind,
                    model = self.generator.model(),
                    elapsed_ms,
                    chars = text.len(),
                    "Generation finished"
                );
                Event::Generated { kind, text }
            }
            Err(e) => {
                warn!(
                    session = %self.session.id,
                    %kind,
                    elapsed_ms,
                    "Generation failed: {}",
                    e
                );
                Event::GenerationFailed {
                    kind,
                    reason: e.to_string(),
                }
            }
        }
    }
}
