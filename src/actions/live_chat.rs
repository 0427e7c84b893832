//! Live-agent placeholder
//!
//! Static "connecting" notice; no submission and no network call.

use super::{ActionHandler, ActionView, FormStatus};
use async_trait::async_trait;

pub struct LiveChatAction;

#[async_trait]
impl ActionHandler for LiveChatAction {
    fn key(&self) -> &'static str {
        "live_chat"
    }

    fn render(&self, _status: &FormStatus) -> ActionView {
        ActionView::Notice {
            title: "Connecting...",
            body: "An associate will be with you shortly. Thank you for your patience.",
            back_label: "Cancel Request",
        }
    }

    fn accepts_submissions(&self) -> bool {
        false
    }
}
