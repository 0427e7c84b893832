//! Dialogue scripts
//!
//! A script is a static graph of conversation states. It is loaded and
//! validated once, then shared read-only by every session of an assistant.

mod catalog;
mod document;
mod profile;
mod validate;

pub use catalog::AssistantCatalog;
#[cfg(test)]
pub use document::ProfileDocument;
pub use profile::{AssistantProfile, CallbackDelivery, OptionScope, PeekSchedule};
#[cfg(test)]
pub use validate::ScriptIssue;
pub use validate::ScriptValidationError;

use document::{ChoiceDocument, ScriptDocument};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a choice leads: another state, or an action handled outside the graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceTarget {
    Next(String),
    Action(String),
}

/// A user-selectable option within a state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(flatten)]
    pub target: ChoiceTarget,
}

impl Choice {
    #[cfg(test)]
    pub fn next(text: impl Into<String>, state_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target: ChoiceTarget::Next(state_id.into()),
        }
    }

    #[cfg(test)]
    pub fn action(text: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target: ChoiceTarget::Action(action.into()),
        }
    }

    #[cfg(test)]
    pub fn next_state(&self) -> Option<&str> {
        match &self.target {
            ChoiceTarget::Next(id) => Some(id),
            ChoiceTarget::Action(_) => None,
        }
    }

    pub fn action_key(&self) -> Option<&str> {
        match &self.target {
            ChoiceTarget::Action(key) => Some(key),
            ChoiceTarget::Next(_) => None,
        }
    }
}

/// A node in the script graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueState {
    pub id: String,
    pub messages: Vec<String>,
    pub options: Vec<Choice>,
    /// Opaque tag naming a structured content block; passed through untouched
    pub rich_content: Option<String>,
}

/// A validated, immutable dialogue script
#[derive(Debug, Clone)]
pub struct DialogueScript {
    initial: String,
    states: HashMap<String, DialogueState>,
}

impl DialogueScript {
    /// Parse and validate a script document.
    ///
    /// Every dangling `next` reference and every malformed choice is reported
    /// in one error; there is no partial script.
    pub fn load(name: &str, doc: ScriptDocument) -> Result<Self, ScriptValidationError> {
        let issues = validate::script_issues(&doc);
        if !issues.is_empty() {
            return Err(ScriptValidationError::new(name, issues));
        }
        Ok(Self::from_checked(doc))
    }

    /// Build from a document that has already passed validation
    fn from_checked(doc: ScriptDocument) -> Self {
        let states = doc
            .states
            .into_iter()
            .map(|(id, state)| {
                let options = state
                    .options
                    .into_iter()
                    .filter_map(ChoiceDocument::into_choice)
                    .collect();
                let node = DialogueState {
                    id: id.clone(),
                    messages: state.messages,
                    options,
                    rich_content: state.rich_content,
                };
                (id, node)
            })
            .collect();

        Self {
            initial: doc.initial,
            states,
        }
    }

    pub fn initial_id(&self) -> &str {
        &self.initial
    }

    /// The designated initial state. Validation guarantees it exists.
    pub fn initial(&self) -> &DialogueState {
        &self.states[&self.initial]
    }

    pub fn state(&self, id: &str) -> Option<&DialogueState> {
        self.states.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    /// Every action key referenced by any choice in the script
    pub fn action_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .states
            .values()
            .flat_map(|s| s.options.iter())
            .filter_map(Choice::action_key)
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}
