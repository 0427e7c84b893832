//! Genie chat - scripted assistant widget backend
//!
//! Serves a finite dialogue script as a chat conversation with simulated
//! typing delays, action forms (callback, email, live chat) and a small
//! email relay.

mod actions;
mod api;
mod config;
mod greeting;
mod peek;
mod relay;
mod runtime;
mod script;
mod state_machine;

use actions::ActionRegistry;
use api::{create_router, AppState};
use config::{RelayConfig, ServerConfig};
use runtime::{RuntimeManager, TokioScheduler};
use script::AssistantCatalog;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genie_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let server_config = ServerConfig::from_env();
    let relay_config = RelayConfig::from_env();

    // Load assistant profiles; a bad script aborts startup
    let catalog = match &server_config.assistants_dir {
        Some(dir) => {
            tracing::info!(path = %dir.display(), "Loading assistant profiles");
            AssistantCatalog::from_dir(dir)?
        }
        None => AssistantCatalog::builtin()?,
    };
    let actions = ActionRegistry::standard();
    catalog.check_actions(&actions)?;
    tracing::info!(assistants = ?catalog.names().collect::<Vec<_>>(), "Assistant catalog ready");

    let notifier = relay_config.notifier();
    let operator_address = relay_config.operator_address();

    let runtime = Arc::new(RuntimeManager::new(
        Arc::new(catalog),
        Arc::new(actions),
        notifier.clone(),
        Arc::new(TokioScheduler),
        operator_address.clone(),
    ));

    // Create application state
    let state = AppState::new(runtime.clone(), notifier, operator_address);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!("Genie chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    runtime.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

/// Returns on SIGINT or SIGTERM
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("Received SIGINT - shutting down"),
        () = terminate => tracing::info!("Received SIGTERM - shutting down"),
    }
}
