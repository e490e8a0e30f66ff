use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for any signed-in user. The router is wrapped in the auth middleware, so
/// handlers always receive a resolved `AuthUser`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The caller's profile: role and premium status.
        .route("/me", get(handlers::get_me))
}
