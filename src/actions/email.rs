//! Send-a-message form

use super::{
    field, unavailable_notice, ActionContext, ActionError, ActionHandler, ActionView, FieldKind,
    FieldSpec, FormFields, FormStatus,
};
use crate::relay::templates;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

pub struct EmailAction;

#[async_trait]
impl ActionHandler for EmailAction {
    fn key(&self) -> &'static str {
        "email"
    }

    fn render(&self, status: &FormStatus) -> ActionView {
        match status {
            FormStatus::Submitted { .. } => ActionView::Notice {
                title: "Message Sent!",
                body: "Thank you for your message. We'll get back to you soon.",
                back_label: "Close",
            },
            FormStatus::Unavailable { .. } => unavailable_notice(),
            FormStatus::Submitting => form("Please wait..."),
            _ => form("Send Message"),
        }
    }

    fn validate(&self, fields: &FormFields) -> Result<(), ActionError> {
        if !EMAIL_RE.is_match(field(fields, "email")) {
            return Err(ActionError::invalid("email", "Please enter a valid email address."));
        }
        if field(fields, "message").is_empty() {
            return Err(ActionError::invalid("message", "Please enter a message."));
        }
        Ok(())
    }

    async fn submit(&self, fields: &FormFields, ctx: &ActionContext) -> Result<String, ActionError> {
        let sender = field(fields, "email");
        let (notification, confirmation) =
            templates::chat_message(&ctx.operator_address, sender, field(fields, "message"));

        ctx.notifier.send(&notification, Some(&confirmation)).await?;
        tracing::info!(sender = %sender, "Chat message relayed");
        Ok("Message sent successfully!".to_string())
    }

    fn failure_message(&self) -> &'static str {
        "Transmission failed. Please try again."
    }
}

fn form(submit_label: &'static str) -> ActionView {
    ActionView::Form {
        title: "Send a Message",
        fields: vec![
            FieldSpec::required("email", FieldKind::Email, "Your Email Address"),
            FieldSpec::required("message", FieldKind::Textarea, "Your message..."),
        ],
        submit_label,
        cancel_label: "Cancel",
    }
}
