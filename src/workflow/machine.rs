//! The stage-progression state machine
//!
//! [`transition`] is a pure function: it never talks to the generator.
//! Whenever a stage needs AI output it answers with [`Effect::Generate`], and
//! the caller reports the outcome back as [`Event::Generated`] or
//! [`Event::GenerationFailed`].
//!
//! Cached outputs follow one rule: a stage asks for generation only while its
//! field is unset, and a field is unset again only when an approval it
//! depends on is revoked.

use tracing::{debug, info, warn};

use super::error::WorkflowError;
use super::ideas::parse_ideas;
use super::types::{Effect, Event, GenerationKind, GenerationRequest, Session, Stage};
use crate::prompts;

/// Apply one event to a session.
pub fn transition(session: Session, event: Event) -> (Session, Effect) {
    let from = session.stage;
    let event_name = event.name();

    let (session, effect) = apply(session, event);

    if session.stage != from {
        info!(
            session = %session.id,
            from = %from,
            to = %session.stage,
            event = event_name,
            "Stage changed"
        );
    }
    if let Effect::Report(err) = &effect {
        warn!(session = %session.id, stage = %session.stage, "{}", err);
    }
    debug_assert!(
        session.check_invariants().is_ok(),
        "{:?}",
        session.check_invariants()
    );

    (session, effect)
}

fn apply(mut session: Session, event: Event) -> (Session, Effect) {
    match (session.stage, event) {
        (_, Event::StartNew) => {
            debug!(session = %session.id, "Discarding session");
            (Session::new(), Effect::None)
        }

        (Stage::InputDetails, Event::Submit(input)) => {
            let missing = input.missing_fields();
            if !missing.is_empty() {
                return (session, Effect::Report(WorkflowError::Validation { missing }));
            }
            session.input = Some(input);
            let effect = request(&session, GenerationKind::Ideas);
            (session, effect)
        }

        (Stage::InputDetails, Event::Enter) => {
            // Regenerate ideas from the inputs already submitted, if any
            let effect = if session.input.is_some() {
                request(&session, GenerationKind::Ideas)
            } else {
                Effect::None
            };
            (session, effect)
        }

        (
            Stage::InputDetails,
            Event::Generated {
                kind: GenerationKind::Ideas,
                text,
            },
        ) if awaiting(&session, Stage::InputDetails, GenerationKind::Ideas) => {
            let ideas = parse_ideas(&text);
            if ideas.is_empty() {
                return (
                    session,
                    Effect::Report(WorkflowError::Generation {
                        kind: GenerationKind::Ideas,
                        reason: "the response contained no ideas".to_string(),
                    }),
                );
            }
            debug!(session = %session.id, count = ideas.len(), "Parsed research ideas");

            session.ideas = ideas;
            session.idea_index = 0;
            session.approved_idea = None;
            session.literature_summary = None;
            session.properties = None;
            session.final_response = None;
            session.stage = Stage::ReviewIdeas;
            (session, Effect::None)
        }

        (Stage::ReviewIdeas, Event::Approve) => match session.current_idea() {
            Some(idea) => {
                session.approved_idea = Some(idea.to_string());
                session.literature_summary = None;
                session.properties = None;
                session.final_response = None;
                session.stage = Stage::LiteratureSummary;
                let effect = enter(&session);
                (session, effect)
            }
            None => exhaust(session),
        },

        (Stage::ReviewIdeas, Event::Reject) => advance_idea(session),

        (Stage::ReviewIdeas, Event::Enter) => {
            if session.current_idea().is_some() {
                (session, Effect::None)
            } else {
                exhaust(session)
            }
        }

        (Stage::LiteratureSummary, Event::Reject) => {
            // The approval of the idea is revoked together with its summary
            session.literature_summary = None;
            session.approved_idea = None;
            advance_idea(session)
        }

        (Stage::PropertiesPrediction, Event::Reject) => {
            session.properties = None;
            session.literature_summary = None;
            session.stage = Stage::LiteratureSummary;
            let effect = enter(&session);
            (session, effect)
        }

        (stage @ (Stage::LiteratureSummary | Stage::PropertiesPrediction), Event::Approve) => {
            if !session.stage_output_ready() {
                return (session, Effect::Report(WorkflowError::OutputPending(stage)));
            }
            session.stage = match stage {
                Stage::LiteratureSummary => Stage::PropertiesPrediction,
                _ => Stage::FinalCompilation,
            };
            let effect = enter(&session);
            (session, effect)
        }

        (
            Stage::LiteratureSummary | Stage::PropertiesPrediction | Stage::FinalCompilation,
            Event::Enter,
        ) => {
            let effect = enter(&session);
            (session, effect)
        }

        (stage, Event::Generated { kind, text })
            if kind != GenerationKind::Ideas && awaiting(&session, stage, kind) =>
        {
            let slot = match kind {
                GenerationKind::LiteratureSummary => &mut session.literature_summary,
                GenerationKind::Properties => &mut session.properties,
                _ => &mut session.final_response,
            };
            *slot = Some(text);
            (session, Effect::None)
        }

        (stage, Event::GenerationFailed { kind, reason }) if awaiting(&session, stage, kind) => {
            // The cached field stays unset so the next entry retries
            (session, Effect::Report(WorkflowError::Generation { kind, reason }))
        }

        (stage, event) => (
            session,
            Effect::Report(WorkflowError::UnexpectedEvent {
                stage,
                event: event.name(),
            }),
        ),
    }
}

/// Whether `stage` is waiting on a generation of `kind`
fn awaiting(session: &Session, stage: Stage, kind: GenerationKind) -> bool {
    if stage.generation() != Some(kind) {
        return false;
    }
    match kind {
        // Ideas are only requested once research details are stored
        GenerationKind::Ideas => session.input.is_some(),
        _ => session.output(kind).is_none(),
    }
}

/// Effect of entering (or re-entering) a generating stage
fn enter(session: &Session) -> Effect {
    match session.stage.generation() {
        Some(kind) if kind != GenerationKind::Ideas && session.output(kind).is_none() => {
            request(session, kind)
        }
        Some(kind) => {
            debug!(session = %session.id, %kind, "Using cached output");
            Effect::None
        }
        None => Effect::None,
    }
}

/// Move the idea cursor forward, falling back to the input stage at the end
fn advance_idea(mut session: Session) -> (Session, Effect) {
    session.idea_index += 1;
    if session.idea_index >= session.ideas.len() {
        return exhaust(session);
    }
    session.stage = Stage::ReviewIdeas;
    (session, Effect::None)
}

fn exhaust(mut session: Session) -> (Session, Effect) {
    session.stage = Stage::InputDetails;
    (session, Effect::Report(WorkflowError::ExhaustedIdeas))
}

/// Build the generation request for `kind` from the session's data
fn request(session: &Session, kind: GenerationKind) -> Effect {
    match build_prompt(session, kind) {
        Ok(prompt) => Effect::Generate(GenerationRequest { kind, prompt }),
        Err(reason) => Effect::Report(WorkflowError::Generation { kind, reason }),
    }
}

fn build_prompt(session: &Session, kind: GenerationKind) -> Result<String, String> {
    let missing = |what: &str| format!("cannot build the {} prompt without {}", kind, what);
    let idea = || {
        session
            .approved_idea
            .as_deref()
            .ok_or_else(|| missing("an approved idea"))
    };

    let rendered = match kind {
        GenerationKind::Ideas => {
            let input = session
                .input
                .as_ref()
                .ok_or_else(|| missing("research details"))?;
            prompts::ideas_prompt(input)
        }
        GenerationKind::LiteratureSummary => prompts::literature_summary_prompt(idea()?),
        GenerationKind::Properties => prompts::properties_prompt(idea()?),
        GenerationKind::FinalResponse => {
            let summary = session
                .literature_summary
                .as_deref()
                .ok_or_else(|| missing("a literature summary"))?;
            let properties = session
                .properties
                .as_deref()
                .ok_or_else(|| missing("properties"))?;
            prompts::final_response_prompt(idea()?, summary, properties)
        }
    };

    rendered.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ResearchInput;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn submit() -> Event {
        Event::Submit(ResearchInput::new(
            "Plastic degradation",
            "Break down PET at room temperature",
            "MOF screening results",
        ))
    }

    fn generated(kind: GenerationKind, text: &str) -> Event {
        Event::Generated {
            kind,
            text: text.to_string(),
        }
    }

    fn failed(kind: GenerationKind, reason: &str) -> Event {
        Event::GenerationFailed {
            kind,
            reason: reason.to_string(),
        }
    }

    fn expect_generate(effect: Effect, kind: GenerationKind) -> String {
        match effect {
            Effect::Generate(request) => {
                assert_eq!(request.kind, kind);
                request.prompt
            }
            other => panic!("expected a {} request, got {:?}", kind, other),
        }
    }

    /// Session at ReviewIdeas with three ideas
    fn reviewing() -> Session {
        let (session, effect) = transition(Session::new(), submit());
        expect_generate(effect, GenerationKind::Ideas);
        let (session, effect) = transition(
            session,
            generated(GenerationKind::Ideas, "1. Foo\n2. Bar\n3. Baz"),
        );
        assert_eq!(effect, Effect::None);
        session
    }

    /// Session at LiteratureSummary for the first idea, summary generated
    fn summarised() -> Session {
        let (session, effect) = transition(reviewing(), Event::Approve);
        expect_generate(effect, GenerationKind::LiteratureSummary);
        let (session, _) = transition(
            session,
            generated(GenerationKind::LiteratureSummary, "summary text"),
        );
        session
    }

    fn at_final() -> Session {
        let (session, effect) = transition(summarised(), Event::Approve);
        expect_generate(effect, GenerationKind::Properties);
        let (session, _) = transition(session, generated(GenerationKind::Properties, "props"));
        let (session, effect) = transition(session, Event::Approve);
        let prompt = expect_generate(effect, GenerationKind::FinalResponse);
        assert!(prompt.contains("summary text"));
        assert!(prompt.contains("props"));
        let (session, _) = transition(
            session,
            generated(GenerationKind::FinalResponse, "overview"),
        );
        session
    }

    #[test]
    fn test_submit_requests_ideas() {
        let (session, effect) = transition(Session::new(), submit());
        let prompt = expect_generate(effect, GenerationKind::Ideas);

        assert!(prompt.contains("Plastic degradation"));
        assert_eq!(session.stage, Stage::InputDetails);
        assert!(session.input.is_some());
    }

    #[test]
    fn test_submit_with_empty_field() {
        let event = Event::Submit(ResearchInput::new("Topic", "  ", ""));
        let (session, effect) = transition(Session::new(), event);

        assert_eq!(
            effect,
            Effect::Report(WorkflowError::Validation {
                missing: vec!["goal", "data"]
            })
        );
        assert_eq!(session.stage, Stage::InputDetails);
        assert!(session.input.is_none());
    }

    #[test]
    fn test_ideas_move_to_review() {
        let session = reviewing();
        assert_eq!(session.stage, Stage::ReviewIdeas);
        assert_eq!(session.ideas, vec!["Foo", "Bar", "Baz"]);
        assert_eq!(session.idea_index, 0);
        assert_eq!(session.current_idea(), Some("Foo"));
    }

    #[test]
    fn test_blank_ideas_stay_at_input() {
        let (session, _) = transition(Session::new(), submit());
        let (session, effect) = transition(session, generated(GenerationKind::Ideas, "   "));

        assert!(matches!(
            effect,
            Effect::Report(WorkflowError::Generation {
                kind: GenerationKind::Ideas,
                ..
            })
        ));
        assert_eq!(session.stage, Stage::InputDetails);
        assert!(session.ideas.is_empty());
    }

    #[test]
    fn test_unnumbered_ideas_fall_back_to_raw_text() {
        let (session, _) = transition(Session::new(), submit());
        let (session, _) = transition(session, generated(GenerationKind::Ideas, "Just one idea"));
        assert_eq!(session.stage, Stage::ReviewIdeas);
        assert_eq!(session.ideas, vec!["Just one idea"]);
    }

    #[test]
    fn test_reject_advances_cursor() {
        let (session, effect) = transition(reviewing(), Event::Reject);
        assert_eq!(effect, Effect::None);
        assert_eq!(session.stage, Stage::ReviewIdeas);
        assert_eq!(session.current_idea(), Some("Bar"));
    }

    #[test]
    fn test_rejecting_last_idea_returns_to_input() {
        let mut session = reviewing();
        for _ in 0..2 {
            session = transition(session, Event::Reject).0;
            assert_eq!(session.stage, Stage::ReviewIdeas);
        }
        let (session, effect) = transition(session, Event::Reject);

        assert_eq!(effect, Effect::Report(WorkflowError::ExhaustedIdeas));
        assert_eq!(session.stage, Stage::InputDetails);
    }

    #[test]
    fn test_review_cursor_never_out_of_bounds() {
        let mut session = reviewing();
        let events = [
            Event::Reject,
            Event::Enter,
            Event::Approve,
            Event::Reject,
            Event::Reject,
            Event::Enter,
            Event::Reject,
        ];
        for event in events {
            session = transition(session, event).0;
            if session.stage == Stage::ReviewIdeas {
                assert!(session.idea_index < session.ideas.len());
            }
            assert_eq!(session.check_invariants(), Ok(()));
        }
    }

    #[test]
    fn test_approve_sets_idea_and_requests_summary() {
        let (session, effect) = transition(reviewing(), Event::Approve);
        let prompt = expect_generate(effect, GenerationKind::LiteratureSummary);

        assert!(prompt.contains("Research Idea: Foo"));
        assert_eq!(session.stage, Stage::LiteratureSummary);
        assert_eq!(session.approved_idea.as_deref(), Some("Foo"));
        assert!(session.literature_summary.is_none());
    }

    #[test]
    fn test_rejecting_summary_moves_to_next_idea() {
        let (session, effect) = transition(summarised(), Event::Reject);

        assert_eq!(effect, Effect::None);
        assert_eq!(session.stage, Stage::ReviewIdeas);
        assert_eq!(session.idea_index, 1);
        assert!(session.literature_summary.is_none());
        assert!(session.approved_idea.is_none());

        // Approving the next idea generates a fresh summary
        let (session, effect) = transition(session, Event::Approve);
        let prompt = expect_generate(effect, GenerationKind::LiteratureSummary);
        assert!(prompt.contains("Research Idea: Bar"));
        assert_eq!(session.approved_idea.as_deref(), Some("Bar"));
    }

    #[test]
    fn test_rejecting_summary_of_last_idea_returns_to_input() {
        let mut session = reviewing();
        session = transition(session, Event::Reject).0;
        session = transition(session, Event::Reject).0;
        session = transition(session, Event::Approve).0;
        session = transition(session, generated(GenerationKind::LiteratureSummary, "s")).0;

        let (session, effect) = transition(session, Event::Reject);
        assert_eq!(effect, Effect::Report(WorkflowError::ExhaustedIdeas));
        assert_eq!(session.stage, Stage::InputDetails);
        assert!(session.literature_summary.is_none());
    }

    #[test]
    fn test_reenter_with_cached_summary_is_a_cache_hit() {
        let (session, effect) = transition(summarised(), Event::Enter);
        assert_eq!(effect, Effect::None);
        assert_eq!(session.literature_summary.as_deref(), Some("summary text"));
    }

    #[test]
    fn test_approve_before_output_is_pending() {
        let (session, _) = transition(reviewing(), Event::Approve);
        let (session, effect) = transition(session, Event::Approve);

        assert_eq!(
            effect,
            Effect::Report(WorkflowError::OutputPending(Stage::LiteratureSummary))
        );
        assert_eq!(session.stage, Stage::LiteratureSummary);
    }

    #[test]
    fn test_generation_failure_keeps_stage_and_field() {
        let (session, _) = transition(reviewing(), Event::Approve);
        let (session, effect) = transition(
            session,
            Event::GenerationFailed {
                kind: GenerationKind::LiteratureSummary,
                reason: "timeout".to_string(),
            },
        );

        assert_eq!(
            effect,
            Effect::Report(WorkflowError::Generation {
                kind: GenerationKind::LiteratureSummary,
                reason: "timeout".to_string()
            })
        );
        assert_eq!(session.stage, Stage::LiteratureSummary);
        assert!(session.literature_summary.is_none());

        // Re-entering retries
        let (_, effect) = transition(session, Event::Enter);
        expect_generate(effect, GenerationKind::LiteratureSummary);
    }

    #[test]
    fn test_rejecting_properties_clears_summary_too() {
        let (session, _) = transition(summarised(), Event::Approve);
        let (session, _) = transition(session, generated(GenerationKind::Properties, "props"));
        assert_eq!(session.properties.as_deref(), Some("props"));

        let (session, effect) = transition(session, Event::Reject);
        expect_generate(effect, GenerationKind::LiteratureSummary);
        assert_eq!(session.stage, Stage::LiteratureSummary);
        assert!(session.properties.is_none());
        assert!(session.literature_summary.is_none());
        assert_eq!(session.approved_idea.as_deref(), Some("Foo"));
        assert_eq!(session.idea_index, 0);
    }

    #[test]
    fn test_full_run_and_start_new() {
        let session = at_final();
        assert_eq!(session.stage, Stage::FinalCompilation);
        assert_eq!(session.final_response.as_deref(), Some("overview"));
        let old_id = session.id;

        let (session, effect) = transition(session, Event::StartNew);
        assert_eq!(effect, Effect::None);
        assert_eq!(session.stage, Stage::InputDetails);
        assert_ne!(session.id, old_id);
        assert_eq!(
            Session {
                id: session.id,
                ..Session::new()
            },
            session
        );
    }

    #[test]
    fn test_final_stage_has_no_reject() {
        let (session, effect) = transition(at_final(), Event::Reject);
        assert_eq!(
            effect,
            Effect::Report(WorkflowError::UnexpectedEvent {
                stage: Stage::FinalCompilation,
                event: "reject"
            })
        );
        assert_eq!(session.stage, Stage::FinalCompilation);
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let session = summarised();
        let (session, effect) = transition(
            session,
            generated(GenerationKind::LiteratureSummary, "late duplicate"),
        );
        assert!(matches!(
            effect,
            Effect::Report(WorkflowError::UnexpectedEvent { .. })
        ));
        assert_eq!(session.literature_summary.as_deref(), Some("summary text"));

        let (session, effect) = transition(session, generated(GenerationKind::Ideas, "1. X"));
        assert!(matches!(effect, Effect::Report(_)));
        assert_eq!(session.stage, Stage::LiteratureSummary);
    }

    #[test]
    fn test_stale_failure_is_ignored() {
        let (session, effect) = transition(
            summarised(),
            failed(GenerationKind::LiteratureSummary, "timeout"),
        );
        assert_eq!(
            effect,
            Effect::Report(WorkflowError::UnexpectedEvent {
                stage: Stage::LiteratureSummary,
                event: "generation failed"
            })
        );
        assert_eq!(session.literature_summary.as_deref(), Some("summary text"));

        let (session, _) = transition(session, Event::StartNew);
        let (session, effect) = transition(session, failed(GenerationKind::Ideas, "timeout"));
        assert_eq!(
            effect,
            Effect::Report(WorkflowError::UnexpectedEvent {
                stage: Stage::InputDetails,
                event: "generation failed"
            })
        );
        assert!(session.input.is_none());
    }

    #[test]
    fn test_ideas_after_reset_are_ignored() {
        let (session, _) = transition(Session::new(), submit());
        let (session, _) = transition(session, Event::StartNew);
        let (session, effect) = transition(session, generated(GenerationKind::Ideas, "1. A"));

        assert!(matches!(effect, Effect::Report(_)));
        assert!(session.ideas.is_empty());
    }

    #[test]
    fn test_enter_at_input_regenerates_after_exhaustion() {
        let mut session = reviewing();
        for _ in 0..3 {
            session = transition(session, Event::Reject).0;
        }
        assert_eq!(session.stage, Stage::InputDetails);

        let (session, effect) = transition(session, Event::Enter);
        expect_generate(effect, GenerationKind::Ideas);
        let (session, _) = transition(session, generated(GenerationKind::Ideas, "1. New"));
        assert_eq!(session.stage, Stage::ReviewIdeas);
        assert_eq!(session.idea_index, 0);
        assert_eq!(session.ideas, vec!["New"]);
    }

    fn kind_strategy() -> impl Strategy<Value = GenerationKind> {
        prop_oneof![
            Just(GenerationKind::Ideas),
            Just(GenerationKind::LiteratureSummary),
            Just(GenerationKind::Properties),
            Just(GenerationKind::FinalResponse),
        ]
    }

    fn event_strategy() -> impl Strategy<Value = Event> {
        prop_oneof![
            any::<bool>().prop_map(|complete| {
                let goal = if complete { "Degrade PET" } else { " " };
                Event::Submit(ResearchInput::new("Catalysis", goal, "MOF screening"))
            }),
            Just(Event::Approve),
            Just(Event::Reject),
            Just(Event::Enter),
            Just(Event::StartNew),
            (kind_strategy(), prop::collection::vec("[a-z]{0,6}", 0..5)).prop_map(
                |(kind, items)| {
                    let text = items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| format!("{}. {}", i + 1, item))
                        .collect::<Vec<_>>()
                        .join("\n");
                    Event::Generated { kind, text }
                }
            ),
            (kind_strategy(), "[a-z \n]{0,12}")
                .prop_map(|(kind, text)| Event::Generated { kind, text }),
            kind_strategy().prop_map(|kind| failed(kind, "service unavailable")),
        ]
    }

    proptest! {
        #[test]
        fn test_invariants_hold_for_any_event_sequence(
            events in prop::collection::vec(event_strategy(), 0..64)
        ) {
            let mut session = Session::new();
            for event in events {
                let (next, _) = transition(session, event.clone());
                prop_assert!(
                    next.check_invariants().is_ok(),
                    "{:?} after {:?}",
                    next.check_invariants(),
                    event
                );
                if next.stage == Stage::ReviewIdeas {
                    prop_assert!(next.idea_index < next.ideas.len());
                }
                session = next;
            }
        }
    }
}
