//! Load-time script validation

use super::document::{ProfileDocument, ScriptDocument};
use std::fmt;
use thiserror::Error;

/// A single problem found in a script or profile document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptIssue {
    MissingInitial {
        initial: String,
    },
    DanglingNext {
        state: String,
        choice: String,
        target: String,
    },
    AmbiguousChoice {
        state: String,
        choice: String,
    },
    EmptyChoice {
        state: String,
        choice: String,
    },
    MissingFallback {
        fallback: String,
    },
    EmptyKeyword {
        target: String,
    },
    DanglingKeywordRoute {
        keyword: String,
        target: String,
    },
    /// The peek must show for a while and hide for a while every cycle
    InvalidPeekSchedule {
        every_ms: u64,
        visible_for_ms: u64,
    },
}

impl fmt::Display for ScriptIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptIssue::MissingInitial { initial } => {
                write!(f, "initial state '{initial}' does not exist")
            }
            ScriptIssue::DanglingNext {
                state,
                choice,
                target,
            } => write!(
                f,
                "state '{state}': choice '{choice}' points to unknown state '{target}'"
            ),
            ScriptIssue::AmbiguousChoice { state, choice } => write!(
                f,
                "state '{state}': choice '{choice}' sets both 'next' and 'action'"
            ),
            ScriptIssue::EmptyChoice { state, choice } => write!(
                f,
                "state '{state}': choice '{choice}' sets neither 'next' nor 'action'"
            ),
            ScriptIssue::MissingFallback { fallback } => {
                write!(f, "free-text fallback state '{fallback}' does not exist")
            }
            ScriptIssue::EmptyKeyword { target } => {
                write!(f, "keyword route to '{target}' has an empty keyword")
            }
            ScriptIssue::DanglingKeywordRoute { keyword, target } => write!(
                f,
                "keyword '{keyword}' routes to unknown state '{target}'"
            ),
            ScriptIssue::InvalidPeekSchedule {
                every_ms,
                visible_for_ms,
            } => write!(
                f,
                "peek schedule needs 0 < visible_for_ms ({visible_for_ms}) < every_ms ({every_ms})"
            ),
        }
    }
}

/// Fatal load-time error listing every issue in a script
#[derive(Debug, Error)]
#[error("script '{script}' is invalid: {}", join_issues(.issues))]
pub struct ScriptValidationError {
    pub script: String,
    pub issues: Vec<ScriptIssue>,
}

impl ScriptValidationError {
    pub fn new(script: impl Into<String>, issues: Vec<ScriptIssue>) -> Self {
        Self {
            script: script.into(),
            issues,
        }
    }
}

fn join_issues(issues: &[ScriptIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collect every structural issue in a script document
pub(super) fn script_issues(doc: &ScriptDocument) -> Vec<ScriptIssue> {
    let mut issues = Vec::new();

    if !doc.states.contains_key(&doc.initial) {
        issues.push(ScriptIssue::MissingInitial {
            initial: doc.initial.clone(),
        });
    }

    for (id, state) in &doc.states {
        for choice in &state.options {
            match (&choice.next, &choice.action) {
                (Some(_), Some(_)) => issues.push(ScriptIssue::AmbiguousChoice {
                    state: id.clone(),
                    choice: choice.text.clone(),
                }),
                (None, None) => issues.push(ScriptIssue::EmptyChoice {
                    state: id.clone(),
                    choice: choice.text.clone(),
                }),
                _ => {}
            }

            if let Some(target) = &choice.next {
                if !doc.states.contains_key(target) {
                    issues.push(ScriptIssue::DanglingNext {
                        state: id.clone(),
                        choice: choice.text.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
    }

    issues
}

/// Issues in the behavior settings, including their references into the script
pub(super) fn behavior_issues(doc: &ProfileDocument) -> Vec<ScriptIssue> {
    let mut issues = Vec::new();
    let free_text = &doc.behavior.free_text;

    if !doc.script.states.contains_key(&free_text.fallback) {
        issues.push(ScriptIssue::MissingFallback {
            fallback: free_text.fallback.clone(),
        });
    }

    for route in &free_text.routes {
        if route.keyword.trim().is_empty() {
            issues.push(ScriptIssue::EmptyKeyword {
                target: route.target.clone(),
            });
        }
        if !doc.script.states.contains_key(&route.target) {
            issues.push(ScriptIssue::DanglingKeywordRoute {
                keyword: route.keyword.clone(),
                target: route.target.clone(),
            });
        }
    }

    if let Some(peek) = &doc.behavior.peek {
        if peek.visible_for_ms == 0 || peek.visible_for_ms >= peek.every_ms {
            issues.push(ScriptIssue::InvalidPeekSchedule {
                every_ms: peek.every_ms,
                visible_for_ms: peek.visible_for_ms,
            });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::DialogueScript;
    use serde_json::json;

    #[test]
    fn test_rejects_choice_with_both_targets() {
        let doc: ScriptDocument = serde_json::from_value(json!({
            "initial": "intro",
            "states": {
                "intro": {
                    "messages": ["hi"],
                    "options": [{ "text": "Both", "next": "intro", "action": "email" }]
                }
            }
        }))
        .unwrap();

        let err = DialogueScript::load("both", doc).unwrap_err();
        assert_eq!(
            err.issues,
            vec![ScriptIssue::AmbiguousChoice {
                state: "intro".to_string(),
                choice: "Both".to_string(),
            }]
        );
    }

    #[test]
    fn test_rejects_dangling_next() {
        let doc: ScriptDocument = serde_json::from_value(json!({
            "initial": "intro",
            "states": {
                "intro": {
                    "messages": ["hi"],
                    "options": [{ "text": "Go", "next": "nowhere" }]
                }
            }
        }))
        .unwrap();

        let err = DialogueScript::load("dangling", doc).unwrap_err();
        assert!(matches!(
            &err.issues[..],
            [ScriptIssue::DanglingNext { target, .. }] if target == "nowhere"
        ));
        assert!(err.to_string().contains("unknown state 'nowhere'"));
    }

    #[test]
    fn test_reports_every_issue_at_once() {
        let doc: ScriptDocument = serde_json::from_value(json!({
            "initial": "missing",
            "states": {
                "a": {
                    "messages": ["a"],
                    "options": [
                        { "text": "Empty" },
                        { "text": "Lost", "next": "b" },
                        { "text": "Also lost", "next": "c" }
                    ]
                }
            }
        }))
        .unwrap();

        let issues = script_issues(&doc);
        assert_eq!(issues.len(), 4);
        assert!(issues.contains(&ScriptIssue::MissingInitial {
            initial: "missing".to_string()
        }));
        assert!(issues.contains(&ScriptIssue::EmptyChoice {
            state: "a".to_string(),
            choice: "Empty".to_string(),
        }));
    }

    #[test]
    fn test_behavior_checks_free_text_targets() {
        let doc: ProfileDocument = serde_json::from_value(json!({
            "name": "t",
            "display_name": "T",
            "script": {
                "initial": "intro",
                "states": { "intro": { "messages": ["hi"] } }
            },
            "behavior": {
                "free_text": {
                    "fallback": "fallback",
                    "routes": [
                        { "keyword": "service", "target": "services" },
                        { "keyword": "  ", "target": "intro" }
                    ]
                }
            }
        }))
        .unwrap();

        let issues = behavior_issues(&doc);
        assert_eq!(
            issues,
            vec![
                ScriptIssue::MissingFallback {
                    fallback: "fallback".to_string()
                },
                ScriptIssue::DanglingKeywordRoute {
                    keyword: "service".to_string(),
                    target: "services".to_string(),
                },
                ScriptIssue::EmptyKeyword {
                    target: "intro".to_string()
                },
            ]
        );
    }

    fn peek_doc(every_ms: u64, visible_for_ms: u64) -> ProfileDocument {
        serde_json::from_value(json!({
            "name": "t",
            "display_name": "T",
            "script": {
                "initial": "intro",
                "states": { "intro": { "messages": ["hi"] } }
            },
            "behavior": {
                "free_text": { "fallback": "intro" },
                "peek": { "first_after_ms": 0, "every_ms": every_ms, "visible_for_ms": visible_for_ms }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_peek_schedule_must_leave_gaps() {
        assert!(behavior_issues(&peek_doc(15_000, 5_000)).is_empty());

        for (every_ms, visible_for_ms) in [(0, 0), (5_000, 0), (5_000, 5_000), (1_000, 3_000)] {
            assert_eq!(
                behavior_issues(&peek_doc(every_ms, visible_for_ms)),
                vec![ScriptIssue::InvalidPeekSchedule {
                    every_ms,
                    visible_for_ms
                }],
                "every {every_ms} visible {visible_for_ms}"
            );
        }
    }
}
