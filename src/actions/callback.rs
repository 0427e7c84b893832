//! Request-a-callback form

use super::{
    field, unavailable_notice, ActionContext, ActionError, ActionHandler, ActionView, FieldKind,
    FieldSpec, FormFields, FormStatus,
};
use crate::relay::templates;
use crate::script::CallbackDelivery;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

/// Digits with the usual separators and an optional leading `+`
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9().\-\s]{7,20}$").expect("phone pattern is valid")
});

pub struct CallbackAction;

/// Matches the pattern and carries 7-15 digits once separators are removed
fn is_phone(value: &str) -> bool {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    PHONE_RE.is_match(value) && (7..=15).contains(&digits)
}

#[async_trait]
impl ActionHandler for CallbackAction {
    fn key(&self) -> &'static str {
        "callback"
    }

    fn render(&self, status: &FormStatus) -> ActionView {
        match status {
            FormStatus::Submitted { .. } => ActionView::Notice {
                title: "Request Received!",
                body: "One of our associates will call you back within 24 hours.",
                back_label: "Close",
            },
            FormStatus::Unavailable { .. } => unavailable_notice(),
            FormStatus::Submitting => form("Please wait..."),
            _ => form("Submit Request"),
        }
    }

    fn validate(&self, fields: &FormFields) -> Result<(), ActionError> {
        if field(fields, "name").is_empty() {
            return Err(ActionError::invalid("name", "Please enter your name."));
        }
        if !is_phone(field(fields, "phone")) {
            return Err(ActionError::invalid("phone", "Please enter a valid phone number."));
        }
        Ok(())
    }

    async fn submit(&self, fields: &FormFields, ctx: &ActionContext) -> Result<String, ActionError> {
        let name = field(fields, "name");
        match ctx.callback_delivery {
            CallbackDelivery::Simulated { delay } => {
                ctx.scheduler.sleep(delay).await;
                tracing::info!(name = %name, "Simulated callback request accepted");
            }
            CallbackDelivery::Notify => {
                let email = templates::callback_request(&ctx.operator_address, name, field(fields, "phone"));
                ctx.notifier.send(&email, None).await?;
                tracing::info!(name = %name, "Callback request forwarded");
            }
        }
        Ok("Request received! We will call you back soon.".to_string())
    }
}

fn form(submit_label: &'static str) -> ActionView {
    ActionView::Form {
        title: "Request a Callback",
        fields: vec![
            FieldSpec::required("name", FieldKind::Text, "Your Name"),
            FieldSpec::required("phone", FieldKind::Tel, "Your Phone Number"),
        ],
        submit_label,
        cancel_label: "Cancel",
    }
}
