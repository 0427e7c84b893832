//! Effects produced by state transitions

use super::state::EntryDraft;
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append an entry to the history
    AppendEntry(EntryDraft),

    /// Schedule the one-shot continuation for the current `Responding` phase
    ScheduleReply { delay: Duration, ticket: u64 },

    /// Enter an action sub-view
    OpenAction { action: String },

    /// Leave the current action sub-view
    CloseAction,

    /// A presentation/engine contract violation was detected and absorbed
    ReportViolation { message: String },
}

impl Effect {
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendEntry(EntryDraft::user(text))
    }

    pub fn schedule(delay: Duration, ticket: u64) -> Self {
        Effect::ScheduleReply { delay, ticket }
    }
}
