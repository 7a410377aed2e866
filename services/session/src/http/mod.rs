//! HTTP surface: pair issuance, refresh, health and metrics.

pub mod error;
pub mod handlers;

use crate::authority::SessionManager;
use crate::directory::UserDirectory;
use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Name of the cookie carrying the access token.
pub const SESSION_COOKIE: &str = "session";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionManager>,
    pub directory: Arc<dyn UserDirectory>,
    /// Used as the session cookie `Max-Age`
    pub access_ttl: Duration,
    /// Take the client address from `X-Forwarded-For` when present
    pub trust_forwarded_for: bool,
}

/// Build the service router.
///
/// The caller must serve it with `into_make_service_with_connect_info` so
/// handlers can see the peer address.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/session", get(handlers::issue_session))
        .route("/refresh", post(handlers::refresh_session))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::render_metrics))
        .route_layer(from_fn(handlers::track_latency))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
