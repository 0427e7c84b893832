//! Assistant profiles: a script plus the behavior knobs that distinguish
//! one assistant from another

use super::document::{
    CallbackDeliveryDocument, GreetingDocument, OptionScopeDocument, ProfileDocument,
};
use super::validate::{behavior_issues, ScriptValidationError};
use super::DialogueScript;
use crate::greeting::GreetingStyle;
use std::collections::BTreeMap;
use std::time::Duration;

/// Which assistant entries keep their options clickable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionScope {
    /// Only the most recent assistant entry
    #[default]
    LatestEntry,
    /// Every assistant entry in the history
    AnyEntry,
}

/// How a callback request is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackDelivery {
    /// No network call; succeeds after the delay
    Simulated { delay: Duration },
    /// Forward to the notification collaborator
    Notify,
}

/// Primitive keyword routing for free text. This is a substring match, not
/// intent classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeTextRouting {
    pub fallback: String,
    pub routes: Vec<KeywordRoute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRoute {
    /// Stored lowercased
    pub keyword: String,
    pub target: String,
}

impl FreeTextRouting {
    /// Case-insensitive substring search; first matching route wins
    pub fn route(&self, text: &str) -> &str {
        let lowered = text.to_lowercase();
        self.routes
            .iter()
            .find(|r| lowered.contains(&r.keyword))
            .map_or(&self.fallback, |r| &r.target)
    }
}

/// Attention animation schedule for a closed widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeekSchedule {
    pub first_after: Duration,
    pub every: Duration,
    pub visible_for: Duration,
}

/// Per-assistant engine configuration
#[derive(Debug, Clone)]
pub struct Behavior {
    pub start_delay: Duration,
    pub reply_delay: Duration,
    pub option_scope: OptionScope,
    pub free_text: FreeTextRouting,
    /// Free text submitted before `start()` starts the conversation first
    pub free_text_starts_conversation: bool,
    pub return_prompt: String,
    pub welcome_back: Vec<String>,
    /// Assistant lines appended before entering an action view; absent means none
    pub action_announcements: BTreeMap<String, Vec<String>>,
    pub greeting: GreetingStyle,
    pub callback_delivery: CallbackDelivery,
    pub peek: Option<PeekSchedule>,
}

impl Behavior {
    pub fn announcement(&self, action: &str) -> &[String] {
        self.action_announcements
            .get(action)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// A fully validated assistant
#[derive(Debug, Clone)]
pub struct AssistantProfile {
    pub name: String,
    pub display_name: String,
    pub script: DialogueScript,
    pub behavior: Behavior,
}

impl AssistantProfile {
    /// Validate the script and its behavior settings together; every issue
    /// from both lands in one error.
    pub fn from_document(doc: ProfileDocument) -> Result<Self, ScriptValidationError> {
        let issues = behavior_issues(&doc);
        let script = match DialogueScript::load(&doc.name, doc.script) {
            Ok(script) if issues.is_empty() => script,
            Ok(_) => return Err(ScriptValidationError::new(doc.name, issues)),
            Err(mut err) => {
                err.issues.extend(issues);
                return Err(err);
            }
        };

        let b = doc.behavior;
        let behavior = Behavior {
            start_delay: Duration::from_millis(b.start_delay_ms),
            reply_delay: Duration::from_millis(b.reply_delay_ms),
            option_scope: match b.option_scope {
                OptionScopeDocument::LatestEntry => OptionScope::LatestEntry,
                OptionScopeDocument::AnyEntry => OptionScope::AnyEntry,
            },
            free_text: FreeTextRouting {
                fallback: b.free_text.fallback,
                routes: b
                    .free_text
                    .routes
                    .into_iter()
                    .map(|r| KeywordRoute {
                        keyword: r.keyword.trim().to_lowercase(),
                        target: r.target,
                    })
                    .collect(),
            },
            free_text_starts_conversation: b.free_text_starts_conversation,
            return_prompt: b.return_prompt,
            welcome_back: b.welcome_back,
            action_announcements: b.action_announcements,
            greeting: match b.greeting {
                GreetingDocument::Standard => GreetingStyle::Standard,
                GreetingDocument::NightOwl => GreetingStyle::NightOwl,
            },
            callback_delivery: match b.callback_delivery {
                CallbackDeliveryDocument::Simulated => CallbackDelivery::Simulated {
                    delay: Duration::from_millis(b.callback_delay_ms),
                },
                CallbackDeliveryDocument::Notify => CallbackDelivery::Notify,
            },
            peek: b.peek.map(|p| PeekSchedule {
                first_after: Duration::from_millis(p.first_after_ms),
                every: Duration::from_millis(p.every_ms),
                visible_for: Duration::from_millis(p.visible_for_ms),
            }),
        };

        Ok(Self {
            name: doc.name,
            display_name: doc.display_name,
            script,
            behavior,
        })
    }
}
