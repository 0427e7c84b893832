//! Session runtime
//!
//! One `ChatRuntime` task per widget instance. Each task exclusively owns its
//! dialogue engine; callers talk to it through a `SessionHandle`, and
//! observers follow it through a broadcast of `SessionEvent`s.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;
pub use traits::*;

use crate::actions::{ActionContext, ActionError, ActionRegistry, ActionState, FormFields};
use crate::peek::run_peek_loop;
use crate::script::{AssistantCatalog, Choice};
use crate::state_machine::{ChatContext, ChatPhase, HistoryEntry};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock};
use tokio_util::sync::CancellationToken;

/// Inputs a caller may send to a session
#[derive(Debug, Clone)]
pub enum Input {
    Start,
    Select(Choice),
    FreeText(String),
    Reset,
    /// Widget visibility; the first open starts the conversation
    SetOpen(bool),
    SubmitForm(FormFields),
    /// The active action view's back/cancel affordance
    ActionBack,
}

/// Structured answer to every input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Accepted,
    /// Declined by the current phase; nothing changed
    Ignored { reason: String },
    /// Refused as invalid; nothing appended
    Rejected { reason: String },
}

impl Outcome {
    pub fn ignored(reason: impl ToString) -> Self {
        Outcome::Ignored {
            reason: reason.to_string(),
        }
    }

    pub fn rejected(reason: impl ToString) -> Self {
        Outcome::Rejected {
            reason: reason.to_string(),
        }
    }

    #[cfg(test)]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted)
    }
}

/// Events sent to observers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    EntryAppended {
        index: usize,
        entry: HistoryEntry,
    },
    PhaseChanged {
        phase: ChatPhase,
        interactive_entries: Vec<usize>,
    },
    /// The open action view changed; `None` when it closed
    ActionView {
        action: Option<ActionState>,
    },
    Peek {
        visible: bool,
    },
    Error {
        message: String,
    },
}

/// Full read-only projection of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub assistant: String,
    pub display_name: String,
    pub open: bool,
    pub phase: ChatPhase,
    pub is_responding: bool,
    pub action: Option<ActionState>,
    pub history: Vec<HistoryEntry>,
    pub interactive_entries: Vec<usize>,
}

/// Messages processed by a session task
#[derive(Debug)]
pub(crate) enum RuntimeMessage {
    Input {
        input: Input,
        reply: oneshot::Sender<Outcome>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// A scheduled typing delay elapsed
    ReplyReady { ticket: u64 },
    /// A form submission finished. `view` identifies which opening of an
    /// action view the submission belongs to.
    FormSettled {
        view: u64,
        attempt: u32,
        result: Result<String, ActionError>,
    },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Unknown assistant '{0}'")]
    UnknownAssistant(String),
    #[error("Session '{0}' not found")]
    SessionNotFound(String),
    #[error("Session '{0}' has shut down")]
    SessionClosed(String),
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: String,
    tx: mpsc::Sender<RuntimeMessage>,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub async fn send(&self, input: Input) -> Result<Outcome, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RuntimeMessage::Input { input, reply })
            .await
            .map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RuntimeMessage::Snapshot { reply })
            .await
            .map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Tear the session down; pending continuations become no-ops
    pub fn close(&self) {
        self.cancel.cancel();
    }

    fn closed(&self) -> RuntimeError {
        RuntimeError::SessionClosed(self.session_id.clone())
    }
}

/// Manager for all session runtimes
pub struct RuntimeManager {
    catalog: Arc<AssistantCatalog>,
    actions: Arc<ActionRegistry>,
    notifier: Arc<dyn Notifier>,
    scheduler: Arc<dyn Scheduler>,
    operator_address: String,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl RuntimeManager {
    pub fn new(
        catalog: Arc<AssistantCatalog>,
        actions: Arc<ActionRegistry>,
        notifier: Arc<dyn Notifier>,
        scheduler: Arc<dyn Scheduler>,
        operator_address: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            actions,
            notifier,
            scheduler,
            operator_address: operator_address.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &AssistantCatalog {
        &self.catalog
    }

    /// Spawn a new session for `assistant`
    pub async fn create(&self, assistant: &str) -> Result<SessionHandle, RuntimeError> {
        let profile = self
            .catalog
            .get(assistant)
            .ok_or_else(|| RuntimeError::UnknownAssistant(assistant.to_string()))?;

        let session_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(64);
        let (events, _) = broadcast::channel(256);
        let (open_tx, open_rx) = watch::channel(false);
        let cancel = CancellationToken::new();

        let action_ctx = ActionContext {
            operator_address: self.operator_address.clone(),
            notifier: self.notifier.clone(),
            scheduler: self.scheduler.clone(),
            callback_delivery: profile.behavior.callback_delivery,
        };

        if let Some(schedule) = profile.behavior.peek {
            tokio::spawn(run_peek_loop(schedule, open_rx, events.clone(), cancel.clone()));
        }

        let runtime = ChatRuntime::new(
            ChatContext::new(&session_id, profile),
            self.actions.clone(),
            action_ctx,
            tx.clone(),
            rx,
            events.clone(),
            open_tx,
            cancel.clone(),
        );

        let id = session_id.clone();
        tokio::spawn(async move {
            runtime.run().await;
            tracing::info!(session_id = %id, "Session runtime finished");
        });

        let handle = SessionHandle {
            session_id: session_id.clone(),
            tx,
            events,
            cancel,
        };
        self.sessions.write().await.insert(session_id, handle.clone());

        tracing::info!(session_id = %handle.session_id, assistant = %assistant, "Session created");
        Ok(handle)
    }

    pub async fn get(&self, session_id: &str) -> Result<SessionHandle, RuntimeError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| RuntimeError::SessionNotFound(session_id.to_string()))
    }

    /// Send an input to a session
    pub async fn send(&self, session_id: &str, input: Input) -> Result<Outcome, RuntimeError> {
        self.get(session_id).await?.send(input).await
    }

    pub async fn remove(&self, session_id: &str) -> Result<(), RuntimeError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| RuntimeError::SessionNotFound(session_id.to_string()))?;
        handle.close();
        tracing::info!(session_id = %session_id, "Session removed");
        Ok(())
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Cancel every session
    pub async fn shutdown(&self) {
        let sessions: Vec<_> = self.sessions.write().await.drain().collect();
        for (_, handle) in sessions {
            handle.close();
        }
    }
}
