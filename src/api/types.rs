//! API request and response types

use crate::actions::FormFields;
use serde::{Deserialize, Serialize};

/// Request to start a session for one assistant
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub assistant: String,
}

/// Widget visibility toggle
#[derive(Debug, Deserialize)]
pub struct OpenRequest {
    pub open: bool,
}

/// Free-text message
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Action form submission
#[derive(Debug, Deserialize)]
pub struct SubmitFormRequest {
    #[serde(default)]
    pub fields: FormFields,
}

#[derive(Debug, Serialize)]
pub struct AssistantSummary {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct AssistantListResponse {
    pub assistants: Vec<AssistantSummary>,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ============================================================
// Relay endpoints
// ============================================================

/// Body of `/api/send-email`; every field may be missing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendEmailRequest {
    pub from: Option<String>,
    pub subject: Option<String>,
    pub html_content: Option<String>,
    pub confirmation_subject: Option<String>,
    pub confirmation_html: Option<String>,
}

/// Body of `/api/contact`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
