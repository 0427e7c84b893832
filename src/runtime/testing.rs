//! Test fixtures and mock implementations
//!
//! These enable engine, action and runtime tests without real I/O.

use super::traits::*;
use super::{Input, Outcome, RuntimeManager, SessionEvent, SessionHandle};
use crate::actions::{ActionContext, ActionRegistry, ActionState, FormStatus};
use crate::relay::{NotificationError, OutboundEmail};
use crate::script::{AssistantCatalog, AssistantProfile, CallbackDelivery, Choice, ProfileDocument};
use crate::state_machine::{ChatContext, ChatPhase, EntryDraft, HistoryEntry};
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Fixture profiles
// ============================================================================

/// A small Genie-like assistant covering options, actions and free text
pub fn sample_profile() -> AssistantProfile {
    let doc: ProfileDocument = serde_json::from_value(json!({
        "name": "sample",
        "display_name": "Sample",
        "script": {
            "initial": "intro",
            "states": {
                "intro": {
                    "messages": ["{greeting}! I'm Sample.", "How can I help?"],
                    "options": [
                        { "text": "Explore Services", "next": "services_overview" },
                        { "text": "Learn About the Company", "next": "company_overview" },
                        { "text": "I have a specific question", "next": "escalate" }
                    ]
                },
                "services_overview": {
                    "messages": ["We build things."],
                    "options": [
                        { "text": "Tell me about the company", "next": "company_overview" },
                        { "text": "Talk to someone", "next": "escalate" }
                    ]
                },
                "company_overview": {
                    "messages": ["We are a company."],
                    "rich_content": "ProjectTimeline",
                    "options": [
                        { "text": "Back to main menu", "next": "intro" }
                    ]
                },
                "escalate": {
                    "messages": ["How would you like to connect?"],
                    "options": [
                        { "text": "Chat with an associate", "action": "live_chat" },
                        { "text": "Request a callback", "action": "callback" },
                        { "text": "Send an Email", "action": "email" },
                        { "text": "Back to main menu", "next": "intro" }
                    ]
                },
                "fallback": {
                    "messages": ["I'm not sure I follow."],
                    "options": [
                        { "text": "Explore Services", "next": "services_overview" },
                        { "text": "Talk to someone", "next": "escalate" }
                    ]
                }
            }
        },
        "behavior": {
            "start_delay_ms": 1000,
            "reply_delay_ms": 1200,
            "free_text": {
                "fallback": "fallback",
                "routes": [{ "keyword": "service", "target": "services_overview" }]
            },
            "action_announcements": {
                "live_chat": ["Connecting you with an associate..."]
            },
            "callback_delivery": "simulated",
            "callback_delay_ms": 1500
        }
    }))
    .unwrap();
    AssistantProfile::from_document(doc).unwrap()
}

/// Minimal two-state script: intro ["hi"] with A → s1 ["ok"]
pub fn scenario_profile() -> AssistantProfile {
    let doc: ProfileDocument = serde_json::from_value(json!({
        "name": "scenario",
        "display_name": "Scenario",
        "script": {
            "initial": "intro",
            "states": {
                "intro": {
                    "messages": ["hi"],
                    "options": [{ "text": "A", "next": "s1" }]
                },
                "s1": { "messages": ["ok"] },
                "fallback": { "messages": ["?"] }
            }
        },
        "behavior": {
            "start_delay_ms": 10,
            "reply_delay_ms": 10,
            "free_text": { "fallback": "fallback" }
        }
    }))
    .unwrap();
    AssistantProfile::from_document(doc).unwrap()
}

/// The sample script, but free text typed before start opens the conversation
pub fn walk_in_profile() -> AssistantProfile {
    let mut profile = sample_profile();
    profile.name = "walk_in".to_string();
    profile.display_name = "Walk-in".to_string();
    profile.behavior.free_text_starts_conversation = true;
    profile
}

pub fn sample_context() -> ChatContext {
    ChatContext::new("test-session", Arc::new(sample_profile()))
}

pub fn scenario_context() -> ChatContext {
    ChatContext::new("test-session", Arc::new(scenario_profile()))
}

pub fn walk_in_context() -> ChatContext {
    ChatContext::new("test-session", Arc::new(walk_in_profile()))
}

/// Turn a draft into a history entry without greeting substitution
pub fn stamp(draft: EntryDraft) -> HistoryEntry {
    let messages = draft.messages.clone();
    draft.stamp(messages, Utc::now())
}

// ============================================================================
// Mock Scheduler
// ============================================================================

/// Scheduler whose delays elapse immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

#[async_trait]
impl Scheduler for ImmediateScheduler {
    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

// ============================================================================
// Mock Notifier
// ============================================================================

/// Records every delivery; optionally fails all of them
#[derive(Default)]
pub struct MockNotifier {
    failure: Option<NotificationError>,
    sent: Mutex<Vec<(OutboundEmail, Option<OutboundEmail>)>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails with a retryable network error
    pub fn failing() -> Self {
        Self::failing_with(NotificationError::network("connection refused"))
    }

    /// Every send fails with `error`
    pub fn failing_with(error: NotificationError) -> Self {
        Self {
            failure: Some(error),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Successful deliveries so far
    pub fn sent(&self) -> Vec<(OutboundEmail, Option<OutboundEmail>)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(
        &self,
        notification: &OutboundEmail,
        confirmation: Option<&OutboundEmail>,
    ) -> Result<(), NotificationError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.sent
            .lock()
            .unwrap()
            .push((notification.clone(), confirmation.cloned()));
        Ok(())
    }
}

pub fn action_context(notifier: Arc<MockNotifier>, callback_delivery: CallbackDelivery) -> ActionContext {
    ActionContext {
        operator_address: "ops@example.com".to_string(),
        notifier,
        scheduler: Arc::new(ImmediateScheduler),
        callback_delivery,
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

fn test_catalog() -> AssistantCatalog {
    AssistantCatalog::from_profiles([sample_profile(), scenario_profile(), walk_in_profile()]).unwrap()
}

/// Manager over the fixture profiles delivering through `notifier`
pub fn manager_with(notifier: Arc<MockNotifier>) -> RuntimeManager {
    RuntimeManager::new(
        Arc::new(test_catalog()),
        Arc::new(ActionRegistry::standard()),
        notifier,
        Arc::new(TokioScheduler),
        "ops@example.com",
    )
}

/// Manager over the fixture profiles with a recording notifier
pub fn test_manager() -> RuntimeManager {
    manager_with(Arc::new(MockNotifier::new()))
}

/// Wait for the next event matching `predicate`, skipping the rest
pub async fn wait_for(
    rx: &mut broadcast::Receiver<SessionEvent>,
    predicate: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    let deadline = Duration::from_secs(60);
    loop {
        let event = tokio::time::timeout(deadline, rx.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("event channel closed");
        if predicate(&event) {
            return event;
        }
    }
}

/// A manager plus the notifier it delivers through
pub struct TestRuntime {
    pub manager: RuntimeManager,
    pub notifier: Arc<MockNotifier>,
}

impl Default for TestRuntime {
    fn default() -> Self {
        Self::with_notifier(MockNotifier::new())
    }
}

impl TestRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notifier(notifier: MockNotifier) -> Self {
        let notifier = Arc::new(notifier);
        Self {
            manager: manager_with(notifier.clone()),
            notifier,
        }
    }

    pub async fn session(&self, assistant: &str) -> TestSession {
        let handle = self.manager.create(assistant).await.unwrap();
        let events = handle.subscribe();
        TestSession { handle, events }
    }
}

/// A session handle with a subscription opened at creation
pub struct TestSession {
    pub handle: SessionHandle,
    pub events: broadcast::Receiver<SessionEvent>,
}

impl TestSession {
    pub async fn send(&self, input: Input) -> Outcome {
        self.handle.send(input).await.unwrap()
    }

    pub async fn wait_for(&mut self, predicate: impl Fn(&SessionEvent) -> bool) -> SessionEvent {
        wait_for(&mut self.events, predicate).await
    }

    pub async fn wait_for_entry(&mut self) -> (usize, HistoryEntry) {
        match self
            .wait_for(|e| matches!(e, SessionEvent::EntryAppended { .. }))
            .await
        {
            SessionEvent::EntryAppended { index, entry } => (index, entry),
            _ => unreachable!(),
        }
    }

    pub async fn wait_for_awaiting_input(&mut self) {
        self.wait_for(|e| {
            matches!(
                e,
                SessionEvent::PhaseChanged {
                    phase: ChatPhase::AwaitingInput,
                    ..
                }
            )
        })
        .await;
    }

    pub async fn wait_for_action_status(&mut self, predicate: impl Fn(&FormStatus) -> bool) -> ActionState {
        let event = self
            .wait_for(|e| match e {
                SessionEvent::ActionView { action: Some(state) } => predicate(&state.status),
                _ => false,
            })
            .await;
        match event {
            SessionEvent::ActionView { action: Some(state) } => state,
            _ => unreachable!(),
        }
    }

    /// Start and wait for the initial entry
    pub async fn start(&mut self) {
        assert!(self.send(Input::Start).await.is_accepted());
        self.wait_for_awaiting_input().await;
    }

    /// Start, go to the escalation menu and pick the action choice `text`
    pub async fn open_action(&mut self, text: &str) {
        self.start().await;
        let escalate = Choice::next("I have a specific question", "escalate");
        assert!(self.send(Input::Select(escalate)).await.is_accepted());
        self.wait_for_awaiting_input().await;

        let snapshot = self.handle.snapshot().await.unwrap();
        let choice = snapshot
            .history
            .last()
            .and_then(|entry| entry.options.iter().find(|c| c.text == text))
            .cloned()
            .expect("action choice offered");
        assert!(self.send(Input::Select(choice)).await.is_accepted());
        self.wait_for(|e| matches!(e, SessionEvent::ActionView { action: Some(_) }))
            .await;
    }
}
