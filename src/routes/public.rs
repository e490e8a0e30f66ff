use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without credentials. Catalog reads resolve the caller as a
/// `Viewer` (anonymous when no token is sent) and only return what that viewer may
/// see at the current time.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Signup through the hosted auth provider plus profile creation.
        .route("/register", post(handlers::register_user))
        // GET /content?type=...
        // The gated catalog, newest first, optionally narrowed to one type.
        .route("/content", get(handlers::list_content))
        // GET /content/grouped
        // The gated catalog partitioned by type.
        .route("/content/grouped", get(handlers::list_content_grouped))
        // GET /content/{id}
        // A single item; hidden items answer 404.
        .route("/content/{id}", get(handlers::get_content_details))
        // GET /offline/policy
        // Cache names and strategies for the service worker.
        .route("/offline/policy", get(handlers::get_offline_policy))
}
