//! Session runtime executor

use super::{Input, Outcome, RuntimeMessage, SessionEvent, SessionSnapshot};
use crate::actions::{ActionContext, ActionError, ActionRegistry, ActionState, FormFields, FormSession};
use crate::state_machine::{ChatContext, ChatPhase, DialogueEngine, Effect, Event, Step};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Runs one session: owns the engine, executes effects, publishes events
pub struct ChatRuntime {
    engine: DialogueEngine,
    actions: Arc<ActionRegistry>,
    action_ctx: ActionContext,
    /// Open action view; present exactly while the engine is in `ActionView`
    form: Option<FormSession>,
    /// Bumped every time an action view opens
    view_seq: u64,
    open: watch::Sender<bool>,
    message_tx: mpsc::Sender<RuntimeMessage>,
    message_rx: mpsc::Receiver<RuntimeMessage>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
}

impl ChatRuntime {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        context: ChatContext,
        actions: Arc<ActionRegistry>,
        action_ctx: ActionContext,
        message_tx: mpsc::Sender<RuntimeMessage>,
        message_rx: mpsc::Receiver<RuntimeMessage>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
        open: watch::Sender<bool>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine: DialogueEngine::new(context),
            actions,
            action_ctx,
            form: None,
            view_seq: 0,
            open,
            message_tx,
            message_rx,
            broadcast_tx,
            cancel,
        }
    }

    fn session_id(&self) -> &str {
        &self.engine.context().session_id
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.session_id(),
            assistant = %self.engine.context().profile.name,
            "Starting session runtime"
        );

        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!(session_id = %self.session_id(), "Session cancelled");
                    break;
                }
                message = self.message_rx.recv() => {
                    let Some(message) = message else { break };
                    self.process(message);
                }
            }
        }
    }

    fn process(&mut self, message: RuntimeMessage) {
        match message {
            RuntimeMessage::Input { input, reply } => {
                let outcome = self.handle_input(input);
                let _ = reply.send(outcome);
            }
            RuntimeMessage::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RuntimeMessage::ReplyReady { ticket } => {
                // Superseded continuations are expected after a reset
                let _ = self.apply(Event::ReplyReady { ticket });
            }
            RuntimeMessage::FormSettled {
                view,
                attempt,
                result,
            } => self.settle_form(view, attempt, result),
        }
    }

    fn handle_input(&mut self, input: Input) -> Outcome {
        tracing::debug!(session_id = %self.session_id(), input = ?input, "Handling input");
        match input {
            Input::Start => self.apply(Event::Start),
            Input::Select(choice) => self.apply(Event::select(choice)),
            Input::FreeText(text) => self.apply(Event::free_text(text)),
            Input::Reset => self.apply(Event::ResetToMain),
            Input::SetOpen(open) => self.set_open(open),
            Input::SubmitForm(fields) => self.submit_form(fields),
            Input::ActionBack => self.action_back(),
        }
    }

    /// Track widget visibility. The first open of an untouched session
    /// starts the conversation.
    fn set_open(&mut self, open: bool) -> Outcome {
        let changed = self.open.send_if_modified(|current| {
            let changed = *current != open;
            *current = open;
            changed
        });
        if changed {
            tracing::debug!(session_id = %self.session_id(), open, "Widget visibility changed");
        }

        if open && matches!(self.engine.phase(), ChatPhase::Idle) && self.engine.history().is_empty() {
            return self.apply(Event::Start);
        }
        Outcome::Accepted
    }

    /// Run an event through the engine and publish what changed
    fn apply(&mut self, event: Event) -> Outcome {
        let now = self.action_ctx.scheduler.now();
        match self.engine.handle(event, now) {
            Ok(step) => {
                self.publish(step);
                Outcome::Accepted
            }
            Err(e) if e.is_contract_violation() => {
                tracing::error!(session_id = %self.session_id(), error = %e, "Input does not match engine state");
                let _ = self.broadcast_tx.send(SessionEvent::Error {
                    message: e.to_string(),
                });
                Outcome::rejected(e)
            }
            Err(e) => {
                tracing::debug!(session_id = %self.session_id(), error = %e, "Event declined");
                Outcome::ignored(e)
            }
        }
    }

    fn publish(&mut self, step: Step) {
        let first = self.engine.history().len() - step.appended.len();
        for (offset, entry) in step.appended.into_iter().enumerate() {
            let _ = self.broadcast_tx.send(SessionEvent::EntryAppended {
                index: first + offset,
                entry,
            });
        }

        for effect in step.effects {
            self.execute_effect(effect);
        }

        if step.phase_changed {
            tracing::debug!(
                session_id = %self.session_id(),
                phase = self.engine.phase().name(),
                "Phase changed"
            );
            let _ = self.broadcast_tx.send(SessionEvent::PhaseChanged {
                phase: self.engine.phase().clone(),
                interactive_entries: self.engine.interactive_entries(),
            });
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            // Applied by the engine before effects reach the runtime
            Effect::AppendEntry(_) => {}

            Effect::ScheduleReply { delay, ticket } => {
                let tx = self.message_tx.clone();
                let scheduler = self.action_ctx.scheduler.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        () = cancel.cancelled() => {}
                        () = scheduler.sleep(delay) => {
                            let _ = tx.send(RuntimeMessage::ReplyReady { ticket }).await;
                        }
                    }
                });
            }

            Effect::OpenAction { action } => {
                if !self.actions.contains(&action) {
                    tracing::error!(session_id = %self.session_id(), action = %action, "No handler for action");
                    let _ = self.broadcast_tx.send(SessionEvent::Error {
                        message: format!("Action '{action}' is not available"),
                    });
                }
                tracing::info!(session_id = %self.session_id(), action = %action, "Action view opened");
                self.view_seq += 1;
                self.form = Some(FormSession::new(action));
                self.publish_action();
            }

            Effect::CloseAction => {
                self.form = None;
                self.publish_action();
            }

            Effect::ReportViolation { message } => {
                tracing::error!(session_id = %self.session_id(), message = %message, "Dialogue contract violation");
                let _ = self.broadcast_tx.send(SessionEvent::Error { message });
            }
        }
    }

    fn submit_form(&mut self, fields: FormFields) -> Outcome {
        let Some(form) = self.form.as_mut() else {
            return Outcome::ignored("No action view is open");
        };
        let Some(handler) = self.actions.get(form.action()) else {
            return Outcome::rejected(format!("Action '{}' is not available", form.action()));
        };

        let attempt = match form.begin_submit(handler.as_ref(), fields) {
            Ok(attempt) => attempt,
            Err(err @ ActionError::Invalid { .. }) => {
                self.publish_action();
                return Outcome::rejected(err);
            }
            Err(err) => return Outcome::ignored(err),
        };

        let fields = form.fields().clone();
        tracing::info!(
            session_id = %self.engine.context().session_id,
            action = %form.action(),
            attempt,
            "Submitting action form"
        );

        let ctx = self.action_ctx.clone();
        let tx = self.message_tx.clone();
        let cancel = self.cancel.clone();
        let view = self.view_seq;
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                result = handler.submit(&fields, &ctx) => {
                    let _ = tx.send(RuntimeMessage::FormSettled { view, attempt, result }).await;
                }
            }
        });

        self.publish_action();
        Outcome::Accepted
    }

    fn settle_form(&mut self, view: u64, attempt: u32, result: Result<String, ActionError>) {
        let session_id = self.engine.context().session_id.clone();
        let form = match self.form.as_mut() {
            Some(form) if view == self.view_seq => form,
            _ => {
                tracing::debug!(session_id = %session_id, "Dropping result for a closed action view");
                return;
            }
        };
        let Some(handler) = self.actions.get(form.action()) else {
            return;
        };

        if let Err(e) = &result {
            if e.is_retryable() {
                tracing::warn!(session_id = %session_id, action = %form.action(), error = %e, "Action submission failed");
            } else {
                tracing::error!(session_id = %session_id, action = %form.action(), error = %e, "Action submission cannot be delivered");
            }
        }

        if form.settle(handler.as_ref(), attempt, result) {
            self.publish_action();
        } else {
            tracing::debug!(session_id = %session_id, attempt, "Dropping superseded submission result");
        }
    }

    /// The action view's back/cancel affordance
    fn action_back(&mut self) -> Outcome {
        let Some(action) = self.engine.active_action() else {
            return Outcome::ignored("No action view is open");
        };
        let event = self
            .actions
            .get(action)
            .map_or(Event::ResetToMain, |handler| handler.on_back());
        self.apply(event)
    }

    fn action_state(&self) -> Option<ActionState> {
        let form = self.form.as_ref()?;
        let handler = self.actions.get(form.action())?;
        Some(form.state(handler.as_ref()))
    }

    fn publish_action(&self) {
        let _ = self.broadcast_tx.send(SessionEvent::ActionView {
            action: self.action_state(),
        });
    }

    fn snapshot(&self) -> SessionSnapshot {
        let context = self.engine.context();
        SessionSnapshot {
            session_id: context.session_id.clone(),
            assistant: context.profile.name.clone(),
            display_name: context.profile.display_name.clone(),
            open: *self.open.borrow(),
            phase: self.engine.phase().clone(),
            is_responding: self.engine.is_responding(),
            action: self.action_state(),
            history: self.engine.history().to_vec(),
            interactive_entries: self.engine.interactive_entries(),
        }
    }
}
