//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
mod engine;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use engine::{DialogueEngine, Step};
pub use event::Event;
pub use state::{ChatContext, ChatPhase, HistoryEntry};
#[cfg(test)]
pub use state::{EntryDraft, PendingReply, Sender};
#[cfg(test)]
pub use transition::TransitionError;
