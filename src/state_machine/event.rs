//! Events that can occur in a conversation

use crate::script::Choice;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Start,
    SelectOption { choice: Choice },
    SubmitFreeText { text: String },
    ResetToMain,

    // Timer events
    ReplyReady { ticket: u64 },
}

impl Event {
    pub fn select(choice: Choice) -> Self {
        Event::SelectOption { choice }
    }

    pub fn free_text(text: impl Into<String>) -> Self {
        Event::SubmitFreeText { text: text.into() }
    }
}
