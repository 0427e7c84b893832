//! Action dispatcher
//!
//! Maps terminal action choices to their sub-views. Each action implements
//! [`ActionHandler`]; the registry is a plain lookup table from action key to
//! handler, so adding an action never touches the dialogue engine.

mod callback;
mod email;
mod live_chat;

pub use callback::CallbackAction;
pub use email::EmailAction;
pub use live_chat::LiveChatAction;

use crate::relay::NotificationError;
use crate::runtime::{Notifier, Scheduler};
use crate::script::CallbackDelivery;
use crate::state_machine::Event;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

/// Field name → entered value
pub type FormFields = BTreeMap<String, String>;

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Tel,
    Email,
    Textarea,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub placeholder: &'static str,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind, placeholder: &'static str) -> Self {
        Self {
            name,
            kind,
            placeholder,
            required: true,
        }
    }
}

/// What the presentation layer should draw for an active action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionView {
    Form {
        title: &'static str,
        fields: Vec<FieldSpec>,
        submit_label: &'static str,
        cancel_label: &'static str,
    },
    Notice {
        title: &'static str,
        body: &'static str,
        back_label: &'static str,
    },
}

// ============================================================================
// Form session
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FormStatus {
    #[default]
    Editing,
    Submitting,
    Submitted { message: String },
    Failed { message: String },
    /// Delivery failed in a way another attempt cannot fix
    Unavailable { message: String },
    Invalid { field: String, message: String },
}

/// Per-action form state while an action view is open
#[derive(Debug, Clone)]
pub struct FormSession {
    action: String,
    fields: FormFields,
    status: FormStatus,
    attempts: u32,
}

impl FormSession {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            fields: FormFields::new(),
            status: FormStatus::Editing,
            attempts: 0,
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    #[cfg(test)]
    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    #[cfg(test)]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Start a submission attempt.
    ///
    /// New values are merged over the ones already entered, so a retry after
    /// a failure keeps the earlier input. Returns the attempt number.
    pub fn begin_submit(&mut self, handler: &dyn ActionHandler, fields: FormFields) -> Result<u32, ActionError> {
        match &self.status {
            FormStatus::Submitting => return Err(ActionError::InFlight),
            FormStatus::Submitted { .. } => return Err(ActionError::AlreadySubmitted),
            FormStatus::Unavailable { .. } => return Err(ActionError::Unavailable(self.action.clone())),
            _ => {}
        }
        if !handler.accepts_submissions() {
            return Err(ActionError::NotSubmittable(self.action.clone()));
        }

        self.fields
            .extend(fields.into_iter().map(|(name, value)| (name, value.trim().to_string())));

        if let Err(err) = handler.validate(&self.fields) {
            if let ActionError::Invalid { field, message } = &err {
                self.status = FormStatus::Invalid {
                    field: field.clone(),
                    message: message.clone(),
                };
            }
            return Err(err);
        }

        self.attempts += 1;
        self.status = FormStatus::Submitting;
        Ok(self.attempts)
    }

    /// Record the result of `attempt`. Results for superseded attempts are
    /// dropped and `false` is returned.
    ///
    /// Errors a retry could fix leave the form open for another attempt;
    /// anything else closes it to further submissions.
    pub fn settle(&mut self, handler: &dyn ActionHandler, attempt: u32, result: Result<String, ActionError>) -> bool {
        if attempt != self.attempts || self.status != FormStatus::Submitting {
            return false;
        }
        self.status = match result {
            Ok(message) => FormStatus::Submitted { message },
            Err(err) if err.is_retryable() => FormStatus::Failed {
                message: handler.failure_message().to_string(),
            },
            Err(_) => FormStatus::Unavailable {
                message: handler.unavailable_message().to_string(),
            },
        };
        true
    }

    pub fn state(&self, handler: &dyn ActionHandler) -> ActionState {
        ActionState {
            action: self.action.clone(),
            view: handler.render(&self.status),
            status: self.status.clone(),
            fields: self.fields.clone(),
            attempts: self.attempts,
        }
    }
}

/// Serializable projection of an open action view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionState {
    pub action: String,
    pub view: ActionView,
    #[serde(flatten)]
    pub status: FormStatus,
    pub fields: FormFields,
    pub attempts: u32,
}

// ============================================================================
// Handler capability
// ============================================================================

/// Shared capabilities handed to handlers on submit
#[derive(Clone)]
pub struct ActionContext {
    pub operator_address: String,
    pub notifier: Arc<dyn Notifier>,
    pub scheduler: Arc<dyn Scheduler>,
    pub callback_delivery: CallbackDelivery,
}

#[derive(Debug, Clone, Error)]
pub enum ActionError {
    #[error("{field}: {message}")]
    Invalid { field: String, message: String },
    #[error("A submission is already in flight")]
    InFlight,
    #[error("This form was already submitted")]
    AlreadySubmitted,
    #[error("Action '{0}' has no form to submit")]
    NotSubmittable(String),
    #[error("Action '{0}' cannot deliver submissions right now")]
    Unavailable(String),
    #[error("Delivery failed: {0}")]
    Delivery(#[from] NotificationError),
}

impl ActionError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ActionError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether submitting the same form again could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ActionError::Delivery(e) => e.is_retryable(),
            ActionError::NotSubmittable(_) | ActionError::Unavailable(_) => false,
            ActionError::Invalid { .. } | ActionError::InFlight | ActionError::AlreadySubmitted => true,
        }
    }
}

/// One action sub-view: `{render, on_submit?, on_back}`
#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn key(&self) -> &'static str;

    fn render(&self, status: &FormStatus) -> ActionView;

    fn accepts_submissions(&self) -> bool {
        true
    }

    fn validate(&self, _fields: &FormFields) -> Result<(), ActionError> {
        Ok(())
    }

    /// Perform the submission; `Ok` carries the user-facing confirmation
    async fn submit(&self, _fields: &FormFields, _ctx: &ActionContext) -> Result<String, ActionError> {
        Err(ActionError::NotSubmittable(self.key().to_string()))
    }

    /// User-facing message for a failed submission
    fn failure_message(&self) -> &'static str {
        "Something went wrong. Please try again."
    }

    /// User-facing message when delivery cannot succeed on retry
    fn unavailable_message(&self) -> &'static str {
        "We can't send this right now. Please reach us through the contact page instead."
    }

    /// Leaving the view always returns to the main flow
    fn on_back(&self) -> Event {
        Event::ResetToMain
    }
}

/// Lookup table from action key to handler
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<&'static str, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// The three built-in actions
    pub fn standard() -> Self {
        Self::default()
            .with(LiveChatAction)
            .with(CallbackAction)
            .with(EmailAction)
    }

    pub fn with(mut self, handler: impl ActionHandler + 'static) -> Self {
        self.handlers.insert(handler.key(), Arc::new(handler));
        self
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    #[cfg(test)]
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.handlers.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

/// Shown in place of a form that can no longer be delivered
fn unavailable_notice() -> ActionView {
    ActionView::Notice {
        title: "Unable to Send",
        body: "Our messaging service is unavailable at the moment.",
        back_label: "Back to Menu",
    }
}

fn field<'a>(fields: &'a FormFields, name: &str) -> &'a str {
    fields.get(name).map_or("", String::as_str)
}
