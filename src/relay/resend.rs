//! Resend transactional email provider

use super::{NotificationError, OutboundEmail};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client for the provider's send endpoint
#[derive(Debug, Clone)]
pub struct ResendClient {
    client: Client,
    api_key: String,
    endpoint: String,
    from_address: String,
}

impl ResendClient {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        from_address: impl Into<String>,
    ) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotificationError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            from_address: from_address.into(),
        })
    }

    fn translate(&self, email: &OutboundEmail) -> ResendRequest {
        let from = match &email.sender_name {
            Some(name) => format!("{name} <{}>", self.from_address),
            None => self.from_address.clone(),
        };
        ResendRequest {
            from,
            to: vec![email.to.clone()],
            subject: email.subject.clone(),
            html: email.html.clone(),
            reply_to: email.reply_to.clone(),
        }
    }

    /// Send one message; returns the provider's message id
    pub async fn deliver(&self, email: &OutboundEmail) -> Result<String, NotificationError> {
        let request = self.translate(email);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotificationError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    NotificationError::network(format!("Connection failed: {e}"))
                } else {
                    NotificationError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NotificationError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        let sent: ResendResponse = serde_json::from_str(&body)
            .map_err(|e| NotificationError::unknown(format!("Failed to parse response: {e} - body: {body}")))?;
        tracing::debug!(message_id = %sent.id, to = %email.to, "Email accepted by provider");
        Ok(sent.id)
    }
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> NotificationError {
    let message = serde_json::from_str::<ResendErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string());
    match status.as_u16() {
        401 | 403 => NotificationError::auth(format!("Authentication failed: {message}")),
        429 => NotificationError::rate_limit(format!("Rate limited: {message}")),
        400 | 422 => NotificationError::rejected(format!("Message rejected: {message}")),
        500..=599 => NotificationError::server_error(format!("Server error: {message}")),
        _ => NotificationError::unknown(format!("HTTP {status}: {message}")),
    }
}

// Resend API types

#[derive(Debug, Serialize)]
struct ResendRequest {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::NotificationErrorKind;

    fn client() -> ResendClient {
        ResendClient::new("re_test", "http://localhost:9/emails", "onboarding@resend.dev").unwrap()
    }

    #[test]
    fn test_translate_adds_sender_name_and_reply_to() {
        let email = OutboundEmail::new("ops@example.com", "Hi", "<p>x</p>")
            .reply_to("visitor@example.com")
            .sender_name("Contact Form");
        let request = client().translate(&email);

        assert_eq!(request.from, "Contact Form <onboarding@resend.dev>");
        assert_eq!(request.to, vec!["ops@example.com".to_string()]);
        assert_eq!(request.reply_to.as_deref(), Some("visitor@example.com"));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["reply_to"], "visitor@example.com");
    }

    #[test]
    fn test_translate_omits_reply_to_when_absent() {
        let email = OutboundEmail::new("ops@example.com", "Hi", "<p>x</p>");
        let json = serde_json::to_value(client().translate(&email)).unwrap();
        assert_eq!(json["from"], "onboarding@resend.dev");
        assert!(json.get("reply_to").is_none());
    }

    #[test]
    fn test_classify_error_statuses() {
        let body = r#"{"statusCode":422,"message":"Invalid `to` field","name":"validation_error"}"#;
        let err = classify_error(reqwest::StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(err.kind, NotificationErrorKind::Rejected);
        assert!(err.message.contains("Invalid `to` field"));

        let err = classify_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow");
        assert_eq!(err.kind, NotificationErrorKind::RateLimit);

        let err = classify_error(reqwest::StatusCode::BAD_GATEWAY, "");
        assert!(err.is_retryable());

        let err = classify_error(reqwest::StatusCode::UNAUTHORIZED, "no");
        assert_eq!(err.kind, NotificationErrorKind::Auth);
    }
}
