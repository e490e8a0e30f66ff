use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Content management, nested under `/admin`. Every handler extracts `AuthUser`
/// (401 without credentials) and refuses non-admins with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /admin/content
        // The ungated catalog, and publishing of new items.
        .route(
            "/content",
            get(handlers::get_admin_content).post(handlers::create_content),
        )
        // DELETE /admin/content/{id}
        .route("/content/{id}", delete(handlers::delete_content))
        // POST /admin/upload/presigned
        // Short-lived upload URL for the file behind an image, video or PDF item.
        .route("/upload/presigned", post(handlers::get_presigned_url))
        // GET /admin/stats
        .route("/stats", get(handlers::get_admin_stats))
        // PUT /admin/users/{id}/premium
        // Grants or revokes premium access.
        .route("/users/{id}/premium", put(handlers::set_user_premium))
}
