//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AssistantListResponse, AssistantSummary, ContactRequest, CreateSessionRequest, ErrorResponse,
    MessageRequest, MessageResponse, OpenRequest, SendEmailRequest, SubmitFormRequest,
    SuccessResponse,
};
use super::AppState;
use crate::relay::templates::{self, ContactSubmission};
use crate::relay::OutboundEmail;
use crate::runtime::{Input, Outcome, RuntimeError, SessionSnapshot};
use crate::script::Choice;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Assistants
        .route("/api/assistants", get(list_assistants))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // User inputs
        .route("/api/sessions/:id/open", post(set_open))
        .route("/api/sessions/:id/start", post(start))
        .route("/api/sessions/:id/select", post(select_option))
        .route("/api/sessions/:id/message", post(send_message))
        .route("/api/sessions/:id/reset", post(reset))
        // Action sub-views
        .route("/api/sessions/:id/action/submit", post(submit_form))
        .route("/api/sessions/:id/action/back", post(action_back))
        // Stand-alone email relay
        .route("/api/send-email", post(send_email).fallback(method_not_allowed))
        .route("/api/contact", post(contact).fallback(method_not_allowed))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Assistants
// ============================================================

async fn list_assistants(State(state): State<AppState>) -> Json<AssistantListResponse> {
    let assistants = state
        .runtime
        .catalog()
        .iter()
        .map(|profile| AssistantSummary {
            name: profile.name.clone(),
            display_name: profile.display_name.clone(),
        })
        .collect();
    Json(AssistantListResponse { assistants })
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let handle = state.runtime.create(&req.assistant).await?;
    let snapshot = handle.snapshot().await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = state.runtime.get(&id).await?;
    Ok(Json(handle.snapshot().await?))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.runtime.remove(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.runtime.get(&id).await?;
    // Subscribe before taking the snapshot so nothing falls in between
    let events = handle.subscribe();
    let snapshot = handle.snapshot().await?;
    Ok(sse_stream(snapshot, events))
}

// ============================================================
// User Inputs
// ============================================================

async fn dispatch(state: &AppState, id: &str, input: Input) -> Result<Json<Outcome>, AppError> {
    let outcome = state.runtime.send(id, input).await?;
    Ok(Json(outcome))
}

async fn set_open(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<OpenRequest>,
) -> Result<Json<Outcome>, AppError> {
    dispatch(&state, &id, Input::SetOpen(req.open)).await
}

async fn start(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Outcome>, AppError> {
    dispatch(&state, &id, Input::Start).await
}

async fn select_option(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(choice): Json<Choice>,
) -> Result<Json<Outcome>, AppError> {
    dispatch(&state, &id, Input::Select(choice)).await
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<Outcome>, AppError> {
    dispatch(&state, &id, Input::FreeText(req.text)).await
}

async fn reset(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Outcome>, AppError> {
    dispatch(&state, &id, Input::Reset).await
}

async fn submit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SubmitFormRequest>,
) -> Result<Json<Outcome>, AppError> {
    dispatch(&state, &id, Input::SubmitForm(req.fields)).await
}

async fn action_back(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Outcome>, AppError> {
    dispatch(&state, &id, Input::ActionBack).await
}

// ============================================================
// Email Relay
// ============================================================

const SENT: &str = "Emails sent successfully!";
const SEND_FAILED: &str = "Failed to send email.";

/// Present and not blank
fn given(field: Option<&String>) -> Option<&str> {
    field.map(String::as_str).filter(|v| !v.trim().is_empty())
}

async fn send_email(
    State(state): State<AppState>,
    Json(req): Json<SendEmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let (Some(from), Some(subject), Some(html)) = (
        given(req.from.as_ref()),
        given(req.subject.as_ref()),
        given(req.html_content.as_ref()),
    ) else {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    };

    let notification = OutboundEmail::new(&state.operator_address, subject, html).reply_to(from);
    let confirmation = match (
        given(req.confirmation_subject.as_ref()),
        given(req.confirmation_html.as_ref()),
    ) {
        (Some(subject), Some(html)) => Some(OutboundEmail::new(from, subject, html)),
        _ => None,
    };

    state
        .notifier
        .send(&notification, confirmation.as_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, kind = ?e.kind, "Email sending error");
            AppError::Internal(SEND_FAILED.to_string())
        })?;

    tracing::info!(reply_to = %from, "Relayed email");
    Ok(Json(MessageResponse::new(SENT)))
}

async fn contact(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let (Some(name), Some(email), Some(subject), Some(message)) = (
        given(req.name.as_ref()),
        given(req.email.as_ref()),
        given(req.subject.as_ref()),
        given(req.message.as_ref()),
    ) else {
        return Err(AppError::BadRequest("All fields are required.".to_string()));
    };

    let form = ContactSubmission {
        name,
        email,
        subject,
        message,
    };
    let (notification, confirmation) = templates::contact_submission(&state.operator_address, &form);

    state
        .notifier
        .send(&notification, Some(&confirmation))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, kind = ?e.kind, "Contact form sending error");
            AppError::Internal(SEND_FAILED.to_string())
        })?;

    tracing::info!(email = %email, "Relayed contact form submission");
    Ok(Json(MessageResponse::new(SENT)))
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("genie-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    MethodNotAllowed,
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::UnknownAssistant(_) => AppError::BadRequest(err.to_string()),
            RuntimeError::SessionNotFound(_) | RuntimeError::SessionClosed(_) => {
                AppError::NotFound(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
