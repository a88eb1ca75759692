// Web module
// Password-gated chat UI served with axum

pub mod handlers;
pub mod templates;

use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AssistantError;
use crate::chat::SessionStore;
use crate::config::Secrets;

/// Name of the cookie carrying the browser session id
pub const SESSION_COOKIE: &str = "api_assistant_session";

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub secrets: Arc<Secrets>,
    pub collection: String,
    pub document_count: usize,
}

#[inline]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/login", post(handlers::login))
        .route("/chat", post(handlers::chat))
        .route("/reset", post(handlers::reset))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the chat UI until Ctrl-C
#[inline]
pub async fn serve(addr: SocketAddr, state: AppState) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        AssistantError::Network(format!("Failed to bind {addr}: {e}"))
    })?;

    info!("Chat server listening on http://{}", addr);

    let sweeper = tokio::spawn(sweep_idle_sessions(Arc::downgrade(&state.sessions)));

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    sweeper.abort();
    served.map_err(|e| AssistantError::Network(format!("Server error: {e}")))?;

    info!("Chat server stopped");
    Ok(())
}

async fn sweep_idle_sessions(sessions: Weak<SessionStore>) {
    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let Some(store) = sessions.upgrade() else {
            break;
        };
        let evicted = store.evict_expired().await;
        if evicted > 0 {
            info!("Dropped {} idle chat sessions", evicted);
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
