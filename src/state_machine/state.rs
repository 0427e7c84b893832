//! Conversation state types

use crate::script::{AssistantProfile, Choice, DialogueState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Assistant,
    User,
}

/// One rendered turn. Immutable once appended; array order is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sender: Sender,
    pub messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Choice>,
    /// Display only
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_content: Option<String>,
}

/// An entry as produced by a transition, before it is stamped and rendered
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub sender: Sender,
    pub messages: Vec<String>,
    pub options: Vec<Choice>,
    pub rich_content: Option<String>,
}

impl EntryDraft {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            messages: vec![text.into()],
            options: vec![],
            rich_content: None,
        }
    }

    pub fn assistant(messages: Vec<String>, options: Vec<Choice>) -> Self {
        Self {
            sender: Sender::Assistant,
            messages,
            options,
            rich_content: None,
        }
    }

    pub fn from_state(state: &DialogueState) -> Self {
        Self {
            sender: Sender::Assistant,
            messages: state.messages.clone(),
            options: state.options.clone(),
            rich_content: state.rich_content.clone(),
        }
    }

    pub fn stamp(self, messages: Vec<String>, timestamp: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            sender: self.sender,
            messages,
            options: self.options,
            timestamp,
            rich_content: self.rich_content,
        }
    }
}

// ============================================================================
// Engine Phase
// ============================================================================

/// What the outstanding delayed continuation will produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingReply {
    /// Append the assistant entry for a script state
    Enter { state_id: String },
    /// Open an action view
    OpenAction { action: String },
    /// Re-greet with the initial state's options
    WelcomeBack,
}

/// Engine phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatPhase {
    /// No history yet
    #[default]
    Idle,

    /// Simulated typing delay outstanding; input is disabled
    Responding {
        /// Identifies the continuation this phase is waiting for
        ticket: u64,
        reply: PendingReply,
        /// Free text submitted before the conversation started, replayed
        /// once the initial entry lands
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deferred_text: Option<String>,
    },

    /// Latest options are live
    AwaitingInput,

    /// An action sub-view is active
    ActionView { action: String },
}

impl ChatPhase {
    pub fn is_responding(&self) -> bool {
        matches!(self, ChatPhase::Responding { .. })
    }

    pub fn active_action(&self) -> Option<&str> {
        match self {
            ChatPhase::ActionView { action } => Some(action),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChatPhase::Idle => "idle",
            ChatPhase::Responding { .. } => "responding",
            ChatPhase::AwaitingInput => "awaiting_input",
            ChatPhase::ActionView { .. } => "action_view",
        }
    }
}

/// Full machine state: the phase plus the continuation ticket counter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatState {
    pub phase: ChatPhase,
    pub last_ticket: u64,
}

impl ChatState {
    pub fn next_ticket(&self) -> u64 {
        self.last_ticket + 1
    }
}

// ============================================================================
// Context
// ============================================================================

/// Context for a conversation (immutable configuration)
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub session_id: String,
    pub profile: Arc<AssistantProfile>,
}

impl ChatContext {
    pub fn new(session_id: impl Into<String>, profile: Arc<AssistantProfile>) -> Self {
        Self {
            session_id: session_id.into(),
            profile,
        }
    }
}
