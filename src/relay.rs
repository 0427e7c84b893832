//! Outbound email relay
//!
//! The notification collaborator: a thin client for the transactional email
//! provider plus the message templates the action forms and relay handlers use.

mod error;
mod resend;
pub mod templates;

pub use error::NotificationError;
#[cfg(test)]
pub use error::NotificationErrorKind;
pub use resend::ResendClient;

use serde::Serialize;

/// One message handed to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// Display name shown in front of the configured sender address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
}

impl OutboundEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
            reply_to: None,
            sender_name: None,
        }
    }

    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    pub fn sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }
}
