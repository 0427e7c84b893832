//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::relay::{NotificationError, OutboundEmail, ResendClient};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::time::Duration;

/// Clock and one-shot timer used for simulated typing delays
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Resolve after `delay`
    async fn sleep(&self, delay: Duration);

    /// Local wall-clock time, used for greetings and timestamps
    fn now(&self) -> DateTime<Local>;
}

/// The outbound notification capability.
///
/// Called at most once per form submission; failures are reported to the
/// caller, never retried here.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        notification: &OutboundEmail,
        confirmation: Option<&OutboundEmail>,
    ) -> Result<(), NotificationError>;
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Real timers
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Adapter to use the email provider as the notifier
#[derive(Debug, Clone)]
pub struct RelayNotifier {
    client: ResendClient,
}

impl RelayNotifier {
    pub fn new(client: ResendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    async fn send(
        &self,
        notification: &OutboundEmail,
        confirmation: Option<&OutboundEmail>,
    ) -> Result<(), NotificationError> {
        self.client.deliver(notification).await?;

        if let Some(confirmation) = confirmation {
            self.client.deliver(confirmation).await?;
        }
        Ok(())
    }
}

/// Stands in when relay credentials are missing; every delivery fails
#[derive(Debug, Clone)]
pub struct DisabledNotifier {
    reason: String,
}

impl DisabledNotifier {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(
        &self,
        notification: &OutboundEmail,
        _confirmation: Option<&OutboundEmail>,
    ) -> Result<(), NotificationError> {
        tracing::warn!(subject = %notification.subject, reason = %self.reason, "Dropping notification");
        Err(NotificationError::config(self.reason.clone()))
    }
}
