//! Serialized shape of assistant profiles
//!
//! These types mirror the JSON documents under `assistants/` one-to-one and
//! carry no invariants; validation turns them into script and behavior types.

use super::{Choice, ChoiceTarget};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete assistant profile: script plus behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub name: String,
    pub display_name: String,
    pub script: ScriptDocument,
    pub behavior: BehaviorDocument,
}

/// The state graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptDocument {
    pub initial: String,
    pub states: BTreeMap<String, StateDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDocument {
    pub messages: Vec<String>,
    #[serde(default)]
    pub options: Vec<ChoiceDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_content: Option<String>,
}

/// A choice as written; may violate the exactly-one-of rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceDocument {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl ChoiceDocument {
    /// Convert to a `Choice` when exactly one of `next`/`action` is set
    pub fn into_choice(self) -> Option<Choice> {
        let target = match (self.next, self.action) {
            (Some(next), None) => ChoiceTarget::Next(next),
            (None, Some(action)) => ChoiceTarget::Action(action),
            _ => return None,
        };
        Some(Choice {
            text: self.text,
            target,
        })
    }
}

fn default_start_delay_ms() -> u64 {
    1000
}

fn default_reply_delay_ms() -> u64 {
    1200
}

fn default_callback_delay_ms() -> u64 {
    1500
}

fn default_return_prompt() -> String {
    "Take me back to the main menu.".to_string()
}

fn default_welcome_back() -> Vec<String> {
    vec!["Of course, let's go back. What would you like to explore?".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorDocument {
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
    #[serde(default)]
    pub option_scope: OptionScopeDocument,
    pub free_text: FreeTextDocument,
    #[serde(default)]
    pub free_text_starts_conversation: bool,
    #[serde(default = "default_return_prompt")]
    pub return_prompt: String,
    #[serde(default = "default_welcome_back")]
    pub welcome_back: Vec<String>,
    #[serde(default)]
    pub action_announcements: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub greeting: GreetingDocument,
    #[serde(default)]
    pub callback_delivery: CallbackDeliveryDocument,
    #[serde(default = "default_callback_delay_ms")]
    pub callback_delay_ms: u64,
    #[serde(default)]
    pub peek: Option<PeekDocument>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionScopeDocument {
    #[default]
    LatestEntry,
    AnyEntry,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GreetingDocument {
    #[default]
    Standard,
    NightOwl,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackDeliveryDocument {
    #[default]
    Simulated,
    Notify,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeTextDocument {
    pub fallback: String,
    #[serde(default)]
    pub routes: Vec<KeywordRouteDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordRouteDocument {
    pub keyword: String,
    pub target: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PeekDocument {
    pub first_after_ms: u64,
    pub every_ms: u64,
    pub visible_for_ms: u64,
}
