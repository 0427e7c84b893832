//! Startup configuration read from the environment

use crate::relay::ResendClient;
use crate::runtime::{DisabledNotifier, Notifier, RelayNotifier};
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_FROM_ADDRESS: &str = "onboarding@resend.dev";
const DEFAULT_RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Load assistant profiles from here instead of the built-in set
    pub assistants_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: lookup("GENIE_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            assistants_dir: lookup("GENIE_ASSISTANTS_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Email relay credentials and addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub api_key: Option<String>,
    /// Operator inbox that receives every notification
    pub target: Option<String>,
    pub from_address: String,
    pub endpoint: String,
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_key: non_empty("RESEND_API_KEY"),
            target: non_empty("EMAIL_TARGET"),
            from_address: non_empty("EMAIL_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            endpoint: non_empty("RESEND_ENDPOINT").unwrap_or_else(|| DEFAULT_RESEND_ENDPOINT.to_string()),
        }
    }

    pub fn operator_address(&self) -> String {
        self.target.clone().unwrap_or_default()
    }

    /// Build the notifier. Missing credentials never abort startup; they
    /// yield a notifier that fails every delivery.
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        let (Some(api_key), Some(_)) = (&self.api_key, &self.target) else {
            tracing::warn!("Email relay not configured. Set RESEND_API_KEY and EMAIL_TARGET.");
            return Arc::new(DisabledNotifier::new("Email relay is not configured"));
        };

        match ResendClient::new(api_key, &self.endpoint, &self.from_address) {
            Ok(client) => {
                tracing::info!(endpoint = %self.endpoint, from = %self.from_address, "Email relay configured");
                Arc::new(RelayNotifier::new(client))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to build email relay client");
                Arc::new(DisabledNotifier::new(e.to_string()))
            }
        }
    }
}
