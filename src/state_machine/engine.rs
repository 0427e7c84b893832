//! The dialogue engine: sole owner and mutator of one conversation's state

use super::state::{ChatPhase, ChatState, HistoryEntry, Sender};
use super::transition::{transition, TransitionError};
use super::{ChatContext, Effect, Event};
use crate::greeting::render_lines;
use crate::script::OptionScope;
use chrono::{DateTime, Local, Utc};

/// Applies transitions to an append-only history.
///
/// `AppendEntry` effects are applied here; every other effect is handed back
/// to the caller to execute.
#[derive(Debug)]
pub struct DialogueEngine {
    context: ChatContext,
    state: ChatState,
    history: Vec<HistoryEntry>,
}

/// What one accepted event changed
#[derive(Debug, Default)]
pub struct Step {
    pub appended: Vec<HistoryEntry>,
    pub effects: Vec<Effect>,
    pub phase_changed: bool,
}

impl DialogueEngine {
    pub fn new(context: ChatContext) -> Self {
        Self {
            context,
            state: ChatState::default(),
            history: Vec::new(),
        }
    }

    pub fn context(&self) -> &ChatContext {
        &self.context
    }

    pub fn phase(&self) -> &ChatPhase {
        &self.state.phase
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn is_responding(&self) -> bool {
        self.state.phase.is_responding()
    }

    pub fn active_action(&self) -> Option<&str> {
        self.state.phase.active_action()
    }

    /// Indices of the history entries whose options are currently clickable
    pub fn interactive_entries(&self) -> Vec<usize> {
        if !matches!(self.state.phase, ChatPhase::AwaitingInput) {
            return vec![];
        }
        let with_options = self
            .history
            .iter()
            .enumerate()
            .filter(|(_, e)| e.sender == Sender::Assistant && !e.options.is_empty())
            .map(|(i, _)| i);

        match self.context.profile.behavior.option_scope {
            OptionScope::AnyEntry => with_options.collect(),
            OptionScope::LatestEntry => {
                let latest = self.history.iter().rposition(|e| e.sender == Sender::Assistant);
                with_options.filter(|i| Some(*i) == latest).collect()
            }
        }
    }

    /// Whether `choice` would be accepted right now
    #[cfg(test)]
    pub fn is_offered(&self, choice: &crate::script::Choice) -> bool {
        matches!(self.state.phase, ChatPhase::AwaitingInput)
            && super::transition::is_live_choice(
                &self.history,
                choice,
                self.context.profile.behavior.option_scope,
            )
    }

    /// Run one event through the state machine.
    ///
    /// On error nothing changes: no entry is appended and no continuation is
    /// scheduled.
    pub fn handle(&mut self, event: Event, now: DateTime<Local>) -> Result<Step, TransitionError> {
        let result = transition(&self.state, &self.context, &self.history, event)?;

        let phase_changed = result.new_state.phase != self.state.phase;
        self.state = result.new_state;

        let style = self.context.profile.behavior.greeting;
        let mut step = Step {
            phase_changed,
            ..Step::default()
        };

        for effect in result.effects {
            match effect {
                Effect::AppendEntry(draft) => {
                    let messages = render_lines(&draft.messages, now, style);
                    let entry = draft.stamp(messages, now.with_timezone(&Utc));
                    self.history.push(entry.clone());
                    step.appended.push(entry);
                }
                other => step.effects.push(other),
            }
        }

        Ok(step)
    }
}
