//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary input sequences.

use super::*;
use crate::runtime::testing::sample_context;
use crate::script::Choice;
use chrono::{DateTime, Local};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn now() -> DateTime<Local> {
    Local::now()
}

/// An abstract user/timer action, resolved against the live engine
#[derive(Debug, Clone)]
enum Op {
    Start,
    /// Pick the n-th option of the latest assistant entry (modulo count)
    SelectOffered(usize),
    SelectBogus,
    FreeText(String),
    Reset,
    Fire,
    FireStale,
}

fn current_ticket(engine: &DialogueEngine) -> Option<u64> {
    match engine.phase() {
        ChatPhase::Responding { ticket, .. } => Some(*ticket),
        _ => None,
    }
}

fn latest_options(engine: &DialogueEngine) -> Vec<Choice> {
    engine
        .history()
        .iter()
        .rev()
        .find(|e| e.sender == Sender::Assistant)
        .map(|e| e.options.clone())
        .unwrap_or_default()
}

fn to_event(engine: &DialogueEngine, op: &Op) -> Option<Event> {
    match op {
        Op::Start => Some(Event::Start),
        Op::SelectOffered(n) => {
            let options = latest_options(engine);
            if options.is_empty() {
                None
            } else {
                Some(Event::select(options[n % options.len()].clone()))
            }
        }
        Op::SelectBogus => Some(Event::select(Choice::next("bogus", "intro"))),
        Op::FreeText(text) => Some(Event::free_text(text.clone())),
        Op::Reset => Some(Event::ResetToMain),
        Op::Fire => current_ticket(engine).map(|ticket| Event::ReplyReady { ticket }),
        Op::FireStale => Some(Event::ReplyReady { ticket: 0 }),
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::Start),
        4 => (0usize..8).prop_map(Op::SelectOffered),
        1 => Just(Op::SelectBogus),
        2 => prop_oneof![
            Just("service".to_string()),
            Just("SERVICE desk".to_string()),
            "[a-z ]{0,12}",
        ]
        .prop_map(Op::FreeText),
        1 => Just(Op::Reset),
        4 => Just(Op::Fire),
        1 => Just(Op::FireStale),
    ]
}

fn arb_input_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..8).prop_map(Op::SelectOffered),
        Just(Op::SelectBogus),
        "[a-z ]{1,12}".prop_map(Op::FreeText),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: history is append-only and failed events change nothing
    #[test]
    fn prop_history_append_only(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let mut engine = DialogueEngine::new(sample_context());

        for op in ops {
            let Some(event) = to_event(&engine, &op) else { continue };
            let before = engine.history().to_vec();
            let phase_before = engine.phase().clone();

            match engine.handle(event, now()) {
                Ok(step) => {
                    let after = engine.history();
                    prop_assert!(after.len() >= before.len());
                    prop_assert_eq!(&after[..before.len()], &before[..]);
                    prop_assert_eq!(after.len() - before.len(), step.appended.len());
                }
                Err(_) => {
                    prop_assert_eq!(engine.history(), &before[..]);
                    prop_assert_eq!(engine.phase(), &phase_before);
                }
            }
        }
    }

    // Invariant 2: scheduling only ever happens on entry to Responding, with
    // the ticket the phase is waiting for
    #[test]
    fn prop_schedule_matches_phase(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let mut engine = DialogueEngine::new(sample_context());

        for op in ops {
            let Some(event) = to_event(&engine, &op) else { continue };
            if let Ok(step) = engine.handle(event, now()) {
                for effect in &step.effects {
                    if let Effect::ScheduleReply { ticket, .. } = effect {
                        prop_assert_eq!(Some(*ticket), current_ticket(&engine));
                    }
                }
                let active = engine.active_action().is_some();
                let opened = step.effects.iter().any(|e| matches!(e, Effect::OpenAction { .. }));
                if opened {
                    prop_assert!(active);
                }
            }
        }
    }

    // Invariant 3: inputs during Responding are rejected without side effects
    #[test]
    fn prop_inputs_rejected_while_responding(
        prefix in proptest::collection::vec(arb_op(), 0..20),
        input in arb_input_op(),
    ) {
        let mut engine = DialogueEngine::new(sample_context());
        for op in prefix {
            if let Some(event) = to_event(&engine, &op) {
                let _ = engine.handle(event, now());
            }
        }
        if !engine.is_responding() {
            let _ = engine.handle(Event::ResetToMain, now());
        }
        prop_assert!(engine.is_responding());

        let before = engine.history().len();
        let phase = engine.phase().clone();
        if let Some(event) = to_event(&engine, &input) {
            let result = engine.handle(event, now());
            prop_assert_eq!(result.unwrap_err(), TransitionError::Busy);
        }
        prop_assert_eq!(engine.history().len(), before);
        prop_assert_eq!(engine.phase(), &phase);
    }

    // Invariant 4: reset always lands on the initial options with no action
    #[test]
    fn prop_reset_reaches_initial_options(ops in proptest::collection::vec(arb_op(), 0..30)) {
        let mut engine = DialogueEngine::new(sample_context());
        for op in ops {
            if let Some(event) = to_event(&engine, &op) {
                let _ = engine.handle(event, now());
            }
        }

        engine.handle(Event::ResetToMain, now()).unwrap();
        prop_assert_eq!(engine.active_action(), None);
        let ticket = current_ticket(&engine).unwrap();
        engine.handle(Event::ReplyReady { ticket }, now()).unwrap();

        let initial = engine.context().profile.script.initial().options.clone();
        prop_assert_eq!(engine.phase(), &ChatPhase::AwaitingInput);
        prop_assert_eq!(&engine.history().last().unwrap().options, &initial);
        for choice in &initial {
            prop_assert!(engine.is_offered(choice));
        }
    }
}
