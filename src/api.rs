//! HTTP API for the chat widget backend

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::{Notifier, RuntimeManager};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
    /// Used directly by the stand-alone relay endpoints
    pub notifier: Arc<dyn Notifier>,
    pub operator_address: String,
}

impl AppState {
    pub fn new(runtime: Arc<RuntimeManager>, notifier: Arc<dyn Notifier>, operator_address: impl Into<String>) -> Self {
        Self {
            runtime,
            notifier,
            operator_address: operator_address.into(),
        }
    }
}
