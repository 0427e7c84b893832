//! Pure state transition function

use super::state::{ChatPhase, ChatState, EntryDraft, HistoryEntry, PendingReply, Sender};
use super::{ChatContext, Effect, Event};
use crate::script::{Choice, ChoiceTarget, OptionScope};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Assistant is responding, input is disabled")]
    Busy,
    #[error("Conversation already started")]
    AlreadyStarted,
    #[error("Conversation has not started")]
    NotStarted,
    #[error("Action view '{0}' is active, return to the main menu first")]
    ActionViewActive(String),
    #[error("Message is empty")]
    EmptyText,
    #[error("Choice '{0}' is not offered by the current entry")]
    InvalidChoice(String),
    #[error("Unknown dialogue state '{0}'")]
    UnknownState(String),
    #[error("Reply {0} is no longer awaited")]
    StaleReply(u64),
}

impl TransitionError {
    /// Desync between presentation and engine, as opposed to an input the
    /// engine simply declines
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            TransitionError::InvalidChoice(_) | TransitionError::UnknownState(_)
        )
    }
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs. Entries are
/// appended through `Effect::AppendEntry`; `history` is only read to check
/// which options are live.
pub fn transition(
    state: &ChatState,
    context: &ChatContext,
    history: &[HistoryEntry],
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let profile = &context.profile;
    let behavior = &profile.behavior;
    let script = &profile.script;

    match (&state.phase, event) {
        // ============================================================
        // Start
        // ============================================================
        (ChatPhase::Idle, Event::Start) => {
            let (next, ticket) = responding(
                state,
                PendingReply::Enter {
                    state_id: script.initial_id().to_string(),
                },
                None,
            );
            Ok(TransitionResult::new(next).with_effect(Effect::schedule(behavior.start_delay, ticket)))
        }

        (_, Event::Start) => Err(TransitionError::AlreadyStarted),

        // ============================================================
        // Busy: input is disabled while a reply is outstanding
        // ============================================================
        (ChatPhase::Responding { .. }, Event::SelectOption { .. } | Event::SubmitFreeText { .. }) => {
            Err(TransitionError::Busy)
        }

        (ChatPhase::ActionView { action }, Event::SelectOption { .. } | Event::SubmitFreeText { .. }) => {
            Err(TransitionError::ActionViewActive(action.clone()))
        }

        // ============================================================
        // Option selection
        // ============================================================
        (ChatPhase::AwaitingInput, Event::SelectOption { choice }) => {
            if !is_live_choice(history, &choice, behavior.option_scope) {
                return Err(TransitionError::InvalidChoice(choice.text));
            }

            let reply = match &choice.target {
                ChoiceTarget::Next(state_id) => {
                    if !script.contains(state_id) {
                        return Err(TransitionError::UnknownState(state_id.clone()));
                    }
                    PendingReply::Enter {
                        state_id: state_id.clone(),
                    }
                }
                ChoiceTarget::Action(action) => PendingReply::OpenAction {
                    action: action.clone(),
                },
            };

            let (next, ticket) = responding(state, reply, None);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::append_user(choice.text))
                .with_effect(Effect::schedule(behavior.reply_delay, ticket)))
        }

        (ChatPhase::Idle, Event::SelectOption { .. }) => Err(TransitionError::NotStarted),

        // ============================================================
        // Free text
        // ============================================================
        (ChatPhase::AwaitingInput, Event::SubmitFreeText { text }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyText);
            }
            let target = behavior.free_text.route(&text).to_string();
            let (next, ticket) = responding(state, PendingReply::Enter { state_id: target }, None);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::append_user(text))
                .with_effect(Effect::schedule(behavior.reply_delay, ticket)))
        }

        // Free text before start: start first, replay the text afterwards
        (ChatPhase::Idle, Event::SubmitFreeText { text }) => {
            if !behavior.free_text_starts_conversation {
                return Err(TransitionError::NotStarted);
            }
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyText);
            }
            let (next, ticket) = responding(
                state,
                PendingReply::Enter {
                    state_id: script.initial_id().to_string(),
                },
                Some(text),
            );
            Ok(TransitionResult::new(next).with_effect(Effect::schedule(behavior.start_delay, ticket)))
        }

        // ============================================================
        // Return to main menu (valid from every phase)
        // ============================================================
        (phase, Event::ResetToMain) => {
            let close = phase.active_action().map(|_| Effect::CloseAction);
            // Text accepted before the start reply landed is still echoed
            let pending_text = match phase {
                ChatPhase::Responding {
                    deferred_text: Some(text),
                    ..
                } => Some(Effect::append_user(text.clone())),
                _ => None,
            };
            let (next, ticket) = responding(state, PendingReply::WelcomeBack, None);
            Ok(TransitionResult::new(next)
                .with_effects(close)
                .with_effects(pending_text)
                .with_effect(Effect::append_user(behavior.return_prompt.clone()))
                .with_effect(Effect::schedule(behavior.reply_delay, ticket)))
        }

        // ============================================================
        // Delayed continuation
        // ============================================================
        (
            ChatPhase::Responding {
                ticket,
                reply,
                deferred_text,
            },
            Event::ReplyReady { ticket: fired },
        ) if *ticket == fired => Ok(complete_reply(state, context, history, reply, deferred_text.clone())),

        (_, Event::ReplyReady { ticket }) => Err(TransitionError::StaleReply(ticket)),
    }
}

fn complete_reply(
    state: &ChatState,
    context: &ChatContext,
    history: &[HistoryEntry],
    reply: &PendingReply,
    deferred_text: Option<String>,
) -> TransitionResult {
    let behavior = &context.profile.behavior;
    let script = &context.profile.script;

    match reply {
        PendingReply::Enter { state_id } => {
            let Some(target) = script.state(state_id) else {
                // Validation makes this unreachable; absorb it rather than wedge
                let phase = if history.is_empty() {
                    ChatPhase::Idle
                } else {
                    ChatPhase::AwaitingInput
                };
                return TransitionResult::new(settled(state, phase)).with_effect(Effect::ReportViolation {
                    message: TransitionError::UnknownState(state_id.clone()).to_string(),
                });
            };

            let entry = Effect::AppendEntry(EntryDraft::from_state(target));

            match deferred_text {
                Some(text) => {
                    let route = behavior.free_text.route(&text).to_string();
                    let (next, ticket) = responding(state, PendingReply::Enter { state_id: route }, None);
                    TransitionResult::new(next)
                        .with_effect(entry)
                        .with_effect(Effect::append_user(text))
                        .with_effect(Effect::schedule(behavior.reply_delay, ticket))
                }
                None => TransitionResult::new(settled(state, ChatPhase::AwaitingInput)).with_effect(entry),
            }
        }

        PendingReply::OpenAction { action } => {
            let announcement = behavior.announcement(action);
            let announce = (!announcement.is_empty())
                .then(|| Effect::AppendEntry(EntryDraft::assistant(announcement.to_vec(), vec![])));

            TransitionResult::new(settled(
                state,
                ChatPhase::ActionView {
                    action: action.clone(),
                },
            ))
            .with_effects(announce)
            .with_effect(Effect::OpenAction {
                action: action.clone(),
            })
        }

        PendingReply::WelcomeBack => {
            let options = script.initial().options.clone();
            TransitionResult::new(settled(state, ChatPhase::AwaitingInput)).with_effect(Effect::AppendEntry(
                EntryDraft::assistant(behavior.welcome_back.clone(), options),
            ))
        }
    }
}

/// Enter `Responding` with a freshly issued ticket
fn responding(state: &ChatState, reply: PendingReply, deferred_text: Option<String>) -> (ChatState, u64) {
    let ticket = state.next_ticket();
    let next = ChatState {
        phase: ChatPhase::Responding {
            ticket,
            reply,
            deferred_text,
        },
        last_ticket: ticket,
    };
    (next, ticket)
}

fn settled(state: &ChatState, phase: ChatPhase) -> ChatState {
    ChatState {
        phase,
        last_ticket: state.last_ticket,
    }
}

/// Whether `choice` is currently offered under the given scope
pub fn is_live_choice(history: &[HistoryEntry], choice: &Choice, scope: OptionScope) -> bool {
    let mut assistant_entries = history.iter().rev().filter(|e| e.sender == Sender::Assistant);
    match scope {
        OptionScope::LatestEntry => assistant_entries
            .next()
            .is_some_and(|e| e.options.contains(choice)),
        OptionScope::AnyEntry => assistant_entries.any(|e| e.options.contains(choice)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{sample_context, stamp};
    use crate::script::Choice;
    use std::time::Duration;

    fn awaiting(last_ticket: u64) -> ChatState {
        ChatState {
            phase: ChatPhase::AwaitingInput,
            last_ticket,
        }
    }

    fn intro_history() -> Vec<HistoryEntry> {
        let ctx = sample_context();
        vec![stamp(EntryDraft::from_state(ctx.profile.script.initial()))]
    }

    #[test]
    fn test_idle_start_schedules_initial_reply() {
        let ctx = sample_context();
        let result = transition(&ChatState::default(), &ctx, &[], Event::Start).unwrap();

        assert_eq!(
            result.new_state.phase,
            ChatPhase::Responding {
                ticket: 1,
                reply: PendingReply::Enter {
                    state_id: "intro".to_string()
                },
                deferred_text: None,
            }
        );
        assert_eq!(
            result.effects,
            vec![Effect::schedule(Duration::from_millis(1000), 1)]
        );
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let ctx = sample_context();
        let first = transition(&ChatState::default(), &ctx, &[], Event::Start).unwrap();
        let second = transition(&first.new_state, &ctx, &[], Event::Start);
        assert_eq!(second.unwrap_err(), TransitionError::AlreadyStarted);
    }

    #[test]
    fn test_select_next_echoes_and_schedules() {
        let ctx = sample_context();
        let history = intro_history();
        let choice = Choice::next("Explore Services", "services_overview");

        let result = transition(&awaiting(1), &ctx, &history, Event::select(choice)).unwrap();

        assert!(matches!(
            &result.new_state.phase,
            ChatPhase::Responding { ticket: 2, reply: PendingReply::Enter { state_id }, .. }
                if state_id == "services_overview"
        ));
        assert_eq!(result.effects[0], Effect::append_user("Explore Services"));
        assert_eq!(
            result.effects[1],
            Effect::schedule(Duration::from_millis(1200), 2)
        );
    }

    #[test]
    fn test_select_unoffered_choice_is_contract_violation() {
        let ctx = sample_context();
        let history = intro_history();
        let choice = Choice::next("Not offered", "services_overview");

        let err = transition(&awaiting(1), &ctx, &history, Event::select(choice)).unwrap_err();
        assert_eq!(err, TransitionError::InvalidChoice("Not offered".to_string()));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_select_while_responding_is_busy() {
        let ctx = sample_context();
        let history = intro_history();
        let state = transition(&awaiting(1), &ctx, &history, Event::free_text("hello"))
            .unwrap()
            .new_state;

        let choice = Choice::next("Explore Services", "services_overview");
        let err = transition(&state, &ctx, &history, Event::select(choice)).unwrap_err();
        assert_eq!(err, TransitionError::Busy);
        assert!(!err.is_contract_violation());
    }

    #[test]
    fn test_action_reply_opens_view_without_message() {
        let ctx = sample_context();
        let state = ChatState {
            phase: ChatPhase::Responding {
                ticket: 3,
                reply: PendingReply::OpenAction {
                    action: "email".to_string(),
                },
                deferred_text: None,
            },
            last_ticket: 3,
        };

        let result = transition(&state, &ctx, &intro_history(), Event::ReplyReady { ticket: 3 }).unwrap();
        assert_eq!(
            result.new_state.phase,
            ChatPhase::ActionView {
                action: "email".to_string()
            }
        );
        assert_eq!(
            result.effects,
            vec![Effect::OpenAction {
                action: "email".to_string()
            }]
        );
    }

    #[test]
    fn test_announced_action_appends_assistant_line() {
        let ctx = sample_context();
        let state = ChatState {
            phase: ChatPhase::Responding {
                ticket: 3,
                reply: PendingReply::OpenAction {
                    action: "live_chat".to_string(),
                },
                deferred_text: None,
            },
            last_ticket: 3,
        };

        let result = transition(&state, &ctx, &intro_history(), Event::ReplyReady { ticket: 3 }).unwrap();
        assert!(matches!(
            &result.effects[0],
            Effect::AppendEntry(draft) if draft.sender == Sender::Assistant && draft.options.is_empty()
        ));
        assert!(matches!(result.effects[1], Effect::OpenAction { .. }));
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let ctx = sample_context();
        let state = ChatState {
            phase: ChatPhase::Responding {
                ticket: 5,
                reply: PendingReply::WelcomeBack,
                deferred_text: None,
            },
            last_ticket: 5,
        };
        let err = transition(&state, &ctx, &[], Event::ReplyReady { ticket: 4 }).unwrap_err();
        assert_eq!(err, TransitionError::StaleReply(4));
    }

    #[test]
    fn test_reset_from_action_view_closes_action() {
        let ctx = sample_context();
        let state = ChatState {
            phase: ChatPhase::ActionView {
                action: "callback".to_string(),
            },
            last_ticket: 2,
        };

        let result = transition(&state, &ctx, &intro_history(), Event::ResetToMain).unwrap();
        assert_eq!(result.effects[0], Effect::CloseAction);
        assert_eq!(
            result.effects[1],
            Effect::append_user("Take me back to the main menu.")
        );
        assert!(matches!(
            result.new_state.phase,
            ChatPhase::Responding {
                ticket: 3,
                reply: PendingReply::WelcomeBack,
                ..
            }
        ));
    }

    #[test]
    fn test_free_text_before_start_is_rejected_by_default() {
        let ctx = sample_context();
        let err = transition(&ChatState::default(), &ctx, &[], Event::free_text("hi")).unwrap_err();
        assert_eq!(err, TransitionError::NotStarted);
    }

    #[test]
    fn test_blank_free_text_is_rejected() {
        let ctx = sample_context();
        let err = transition(&awaiting(1), &ctx, &intro_history(), Event::free_text("   ")).unwrap_err();
        assert_eq!(err, TransitionError::EmptyText);
    }

    #[test]
    fn test_missing_target_state_recovers_to_awaiting_input() {
        let ctx = sample_context();
        let state = ChatState {
            phase: ChatPhase::Responding {
                ticket: 2,
                reply: PendingReply::Enter {
                    state_id: "ghost".to_string(),
                },
                deferred_text: None,
            },
            last_ticket: 2,
        };

        let result = transition(&state, &ctx, &intro_history(), Event::ReplyReady { ticket: 2 }).unwrap();
        assert_eq!(result.new_state.phase, ChatPhase::AwaitingInput);
        assert!(matches!(
            &result.effects[..],
            [Effect::ReportViolation { message }] if message.contains("ghost")
        ));
    }

    #[test]
    fn test_option_scope_any_entry_accepts_older_options() {
        let ctx = sample_context();
        let mut history = intro_history();
        let services = ctx.profile.script.state("services_overview").unwrap();
        history.push(stamp(EntryDraft::user("Explore Services")));
        history.push(stamp(EntryDraft::from_state(services)));

        let old_choice = ctx.profile.script.initial().options[0].clone();
        assert!(!is_live_choice(&history, &old_choice, OptionScope::LatestEntry));
        assert!(is_live_choice(&history, &old_choice, OptionScope::AnyEntry));
    }
}
