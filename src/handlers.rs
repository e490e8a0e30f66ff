use crate::{
    AppState,
    access::{AccessFilter, ContentTab, Viewer, filter_by_tab, group_by_type},
    auth::AuthUser,
    models::{
        AdminDashboardStats, ContentItem, ContentType, CreateContentRequest, PresignedUrlRequest,
        PresignedUrlResponse, Profile, RegisterUserRequest, Role, UserProfile,
    },
    offline::CachePolicy,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use uuid::Uuid;

// --- Filter Structs ---

/// ContentQuery
///
/// Query parameters of GET /content. `type` selects a single tab.
#[derive(Deserialize, utoipa::IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ContentQuery {
    #[serde(rename = "type")]
    pub content_type: Option<ContentType>,
}

/// OfflinePolicyQuery
///
/// `caches` lists the cache names the worker currently holds, comma separated.
#[derive(Deserialize, utoipa::IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct OfflinePolicyQuery {
    pub caches: Option<String>,
}

/// Minimal view of the auth provider's signup response.
#[derive(Deserialize)]
struct SignupResponse {
    id: Uuid,
}

/// File extension for an object key. Anything but a short alphanumeric extension
/// would leak into the public URL as a query, fragment or space, so it becomes `bin`.
pub fn object_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| (1..=8).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(|| "bin".to_string(), str::to_ascii_lowercase)
}

fn require_admin(user: &AuthUser) -> Result<(), StatusCode> {
    if user.is_admin() {
        Ok(())
    } else {
        tracing::debug!(user_id = %user.id, "admin route refused");
        Err(StatusCode::FORBIDDEN)
    }
}

// --- Public Handlers ---

/// list_content
///
/// [Public Route] The catalog as the caller is allowed to see it right now,
/// newest first, optionally narrowed to one content type.
#[utoipa::path(
    get,
    path = "/content",
    params(ContentQuery),
    responses(
        (status = 200, description = "Visible content", body = [ContentItem]),
        (status = 401, description = "Invalid token")
    )
)]
pub async fn list_content(
    viewer: Viewer,
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> Json<Vec<ContentItem>> {
    let catalog = state.repo.list_content().await;
    let visible = AccessFilter::new(viewer, state.clock.now()).apply(catalog);
    Json(filter_by_tab(visible, ContentTab::from(query.content_type)))
}

/// list_content_grouped
///
/// [Public Route] Same gating as `list_content`, partitioned by content type.
#[utoipa::path(
    get,
    path = "/content/grouped",
    responses((status = 200, description = "Visible content keyed by type"))
)]
pub async fn list_content_grouped(
    viewer: Viewer,
    State(state): State<AppState>,
) -> Json<BTreeMap<ContentType, Vec<ContentItem>>> {
    let catalog = state.repo.list_content().await;
    let visible = AccessFilter::new(viewer, state.clock.now()).apply(catalog);
    Json(group_by_type(visible))
}

/// get_content_details
///
/// [Public Route] A single item. Items the caller may not see are reported as
/// missing so their existence does not leak.
#[utoipa::path(
    get,
    path = "/content/{id}",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Found", body = ContentItem),
        (status = 404, description = "Not found or not visible")
    )
)]
pub async fn get_content_details(
    viewer: Viewer,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContentItem>, StatusCode> {
    let item = state.repo.get_content(id).await.ok_or(StatusCode::NOT_FOUND)?;

    match AccessFilter::new(viewer, state.clock.now()).evaluate(&item) {
        Ok(()) => Ok(Json(item)),
        Err(denial) => {
            tracing::debug!(content_id = %id, viewer = ?viewer, %denial, "content withheld");
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// get_offline_policy
///
/// [Public Route] The caching policy the service worker applies, including which of
/// its existing caches to drop on activation.
#[utoipa::path(
    get,
    path = "/offline/policy",
    params(OfflinePolicyQuery),
    responses((status = 200, description = "Cache policy", body = CachePolicy))
)]
pub async fn get_offline_policy(Query(query): Query<OfflinePolicyQuery>) -> Json<CachePolicy> {
    let existing = query.caches.unwrap_or_default();
    Json(CachePolicy::for_existing(
        existing.split(',').map(str::trim).filter(|name| !name.is_empty()),
    ))
}

/// register_user
///
/// [Public Route] Creates the identity at the hosted auth provider, then mirrors it
/// into `public.profiles` under the provider-issued id. New accounts are always
/// regular, non-premium users.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Registered", body = UserProfile),
        (status = 400, description = "Rejected by the auth provider")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<UserProfile>, StatusCode> {
    let (Some(auth_url), Some(api_key)) = (&state.config.auth_url, &state.config.auth_api_key)
    else {
        tracing::error!("register_user: auth provider is not configured");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };

    let response = reqwest::Client::new()
        .post(format!("{}/auth/v1/signup", auth_url))
        .header("apikey", api_key)
        .json(&serde_json::json!({
            "email": payload.email,
            "password": payload.password,
            "data": { "full_name": payload.full_name },
        }))
        .send()
        .await
        .map_err(|e| {
            tracing::error!("register_user: signup request failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if !response.status().is_success() {
        // Duplicate email, weak password, ...
        tracing::info!("register_user: signup rejected with {}", response.status());
        return Err(StatusCode::BAD_REQUEST);
    }

    let signup = response.json::<SignupResponse>().await.map_err(|e| {
        tracing::error!("register_user: unexpected signup response: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let profile = Profile {
        id: signup.id,
        email: payload.email,
        full_name: payload.full_name,
        role: Role::User.as_str().to_string(),
        is_premium: false,
    };

    let created = state
        .repo
        .create_profile(profile)
        .await
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(UserProfile {
        role: created.role(),
        id: created.id,
        email: created.email,
        full_name: created.full_name,
        is_premium: created.is_premium,
    }))
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The caller's profile, including role and premium status.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_me(user: AuthUser) -> Json<UserProfile> {
    Json(UserProfile {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        role: user.role,
        is_premium: user.is_premium,
    })
}

// --- Admin Handlers ---

/// get_admin_content
///
/// [Admin Route] The whole catalog, ungated, newest first.
#[utoipa::path(
    get,
    path = "/admin/content",
    responses(
        (status = 200, description = "All content", body = [ContentItem]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_content(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ContentItem>>, StatusCode> {
    require_admin(&user)?;
    Ok(Json(state.repo.list_content().await))
}

/// create_content
///
/// [Admin Route] Publishes a new item. The uploader is taken from the session.
#[utoipa::path(
    post,
    path = "/admin/content",
    request_body = CreateContentRequest,
    responses(
        (status = 201, description = "Created", body = ContentItem),
        (status = 400, description = "Invalid item"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_content(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateContentRequest>,
) -> Result<(StatusCode, Json<ContentItem>), StatusCode> {
    require_admin(&user)?;

    let new_content = payload.validate(state.clock.today()).map_err(|e| {
        tracing::info!("create_content rejected: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    let item = state
        .repo
        .create_content(new_content, user.id)
        .await
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::info!(content_id = %item.id, kind = %item.content_type(), "content published");
    Ok((StatusCode::CREATED, Json(item)))
}

/// delete_content
///
/// [Admin Route] Removes an item.
#[utoipa::path(
    delete,
    path = "/admin/content/{id}",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_content(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if let Err(status) = require_admin(&user) {
        return status;
    }

    if state.repo.delete_content(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// get_presigned_url
///
/// [Admin Route] Issues a short-lived URL for uploading the file behind a media
/// item straight to object storage. The MIME type must fit the declared kind.
#[utoipa::path(
    post,
    path = "/admin/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 400, description = "MIME type does not match the content type"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_presigned_url(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> impl IntoResponse {
    if let Err(status) = require_admin(&user) {
        return status.into_response();
    }

    if !payload.content_type.accepts_mime(&payload.file_type) {
        return (StatusCode::BAD_REQUEST, "file type does not match content type").into_response();
    }

    let object_key = format!("uploads/{}.{}", Uuid::new_v4(), object_extension(&payload.filename));

    match state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await
    {
        Ok(upload_url) => {
            let response = PresignedUrlResponse {
                upload_url,
                public_url: state.storage.public_url(&object_key),
                resource_key: object_key,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!("storage error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed").into_response()
        }
    }
}

/// get_admin_stats
///
/// [Admin Route] Dashboard counters.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, StatusCode> {
    require_admin(&user)?;
    Ok(Json(state.repo.get_stats(state.clock.today()).await))
}

/// set_user_premium
///
/// [Admin Route] Grants or revokes premium access for a user.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/premium",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = bool,
    responses(
        (status = 200, description = "Updated", body = Profile),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user")
    )
)]
pub async fn set_user_premium(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(is_premium): Json<bool>,
) -> Result<Json<Profile>, StatusCode> {
    require_admin(&user)?;

    match state.repo.set_premium(id, is_premium).await {
        Some(profile) => {
            tracing::info!(user_id = %id, is_premium, "premium status changed");
            Ok(Json(profile))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}
