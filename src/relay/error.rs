//! Notification error types

use thiserror::Error;

/// Delivery failure with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct NotificationError {
    pub kind: NotificationErrorKind,
    pub message: String,
}

impl NotificationError {
    pub fn new(kind: NotificationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(NotificationErrorKind::Config, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(NotificationErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(NotificationErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(NotificationErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(NotificationErrorKind::Auth, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(NotificationErrorKind::Rejected, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(NotificationErrorKind::Unknown, message)
    }

    /// Whether resubmitting the same form could succeed
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationErrorKind {
    /// Relay credentials or destination are not configured
    Config,
    /// Network issues, timeouts - retryable
    Network,
    /// Rate limited (429) - retryable
    RateLimit,
    /// Server error (5xx) - retryable
    ServerError,
    /// Authentication failed (401, 403) - not retryable
    Auth,
    /// Provider refused the message (400, 422) - not retryable
    Rejected,
    Unknown,
}

impl NotificationErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(NotificationError::network("timeout").is_retryable());
        assert!(NotificationError::rate_limit("slow down").is_retryable());
        assert!(NotificationError::server_error("502").is_retryable());
        assert!(!NotificationError::auth("bad key").is_retryable());
        assert!(!NotificationError::config("missing key").is_retryable());
        assert!(!NotificationError::rejected("invalid to").is_retryable());
    }

    #[test]
    fn test_display_is_message() {
        let err = NotificationError::network("Connection failed");
        assert_eq!(err.to_string(), "Connection failed");
    }
}
