mod common;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::{MemoryRepo, at, date, premium, profile, state_with, text_item, video_item};
use uuid::Uuid;
use vitalidad_portal::{
    AppState,
    access::Viewer,
    auth::AuthUser,
    handlers::{self, ContentQuery},
    models::{
        ContentItem, ContentType, CreateContentRequest, PresignedUrlRequest, PresignedUrlResponse,
        Profile, RegisterUserRequest, Role,
    },
    storage::{MockStorageService, StorageState},
};

// --- TEST UTILITIES ---

const TEST_ADMIN_ID: Uuid = Uuid::from_u128(456);
const TEST_MEMBER_ID: Uuid = Uuid::from_u128(123);

fn admin_user() -> AuthUser {
    AuthUser {
        id: TEST_ADMIN_ID,
        email: "admin@vitalidad.test".to_string(),
        full_name: None,
        role: Role::Admin,
        is_premium: false,
    }
}

fn member_user() -> AuthUser {
    AuthUser {
        id: TEST_MEMBER_ID,
        email: "member@vitalidad.test".to_string(),
        full_name: Some("Ana".to_string()),
        role: Role::User,
        is_premium: true,
    }
}

/// Newest first: a premium video, a free text item and a scheduled text item.
fn catalog() -> Vec<ContentItem> {
    vec![
        premium(video_item("Pilates")),
        text_item("Hidratación"),
        ContentItem {
            release_date: Some(date(2025, 2, 1)),
            ..text_item("Febrero")
        },
    ]
}

fn catalog_state() -> AppState {
    state_with(MemoryRepo::with(catalog(), vec![]), at(2025, 1, 10, 0))
}

fn titles(items: &[ContentItem]) -> Vec<&str> {
    items.iter().map(|c| c.title.as_str()).collect()
}

// --- PUBLIC HANDLERS ---

#[tokio::test]
async fn test_list_content_anonymous_sees_free_released_only() {
    let Json(items) = handlers::list_content(
        Viewer::Anonymous,
        State(catalog_state()),
        Query(ContentQuery::default()),
    )
    .await;

    assert_eq!(titles(&items), ["Hidratación"]);
}

#[tokio::test]
async fn test_list_content_premium_member_sees_premium() {
    let Json(items) = handlers::list_content(
        Viewer::Member { is_premium: true },
        State(catalog_state()),
        Query(ContentQuery::default()),
    )
    .await;

    assert_eq!(titles(&items), ["Pilates", "Hidratación"]);
}

#[tokio::test]
async fn test_list_content_type_tab() {
    let Json(items) = handlers::list_content(
        Viewer::Admin,
        State(catalog_state()),
        Query(ContentQuery {
            content_type: Some(ContentType::Video),
        }),
    )
    .await;

    assert_eq!(titles(&items), ["Pilates"]);
}

#[tokio::test]
async fn test_list_content_grouped() {
    let Json(groups) =
        handlers::list_content_grouped(Viewer::Admin, State(catalog_state())).await;

    assert_eq!(titles(&groups[&ContentType::Video]), ["Pilates"]);
    // The scheduled item stays hidden even from admins.
    assert_eq!(titles(&groups[&ContentType::Text]), ["Hidratación"]);
}

#[tokio::test]
async fn test_get_content_details_success() {
    let item = text_item("Descanso");
    let state = state_with(MemoryRepo::with(vec![item.clone()], vec![]), at(2025, 1, 10, 0));

    let Json(found) = handlers::get_content_details(Viewer::Anonymous, State(state), Path(item.id))
        .await
        .unwrap();
    assert_eq!(found, item);
}

#[tokio::test]
async fn test_get_content_details_hidden_is_not_found() {
    let item = premium(text_item("Exclusivo"));
    let state = state_with(MemoryRepo::with(vec![item.clone()], vec![]), at(2025, 1, 10, 0));

    let result = handlers::get_content_details(
        Viewer::Member { is_premium: false },
        State(state.clone()),
        Path(item.id),
    )
    .await;
    assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);

    let missing = handlers::get_content_details(Viewer::Admin, State(state), Path(Uuid::new_v4())).await;
    assert_eq!(missing.unwrap_err(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_register_without_auth_provider_fails() {
    let state = catalog_state();
    let payload = RegisterUserRequest {
        email: "nuevo@vitalidad.test".to_string(),
        password: "s3cret-pass".to_string(),
        full_name: None,
    };

    let result = handlers::register_user(State(state), Json(payload)).await;
    assert_eq!(result.unwrap_err(), StatusCode::INTERNAL_SERVER_ERROR);
}

// --- AUTHENTICATED HANDLERS ---

#[tokio::test]
async fn test_get_me() {
    let Json(me) = handlers::get_me(member_user()).await;

    assert_eq!(me.id, TEST_MEMBER_ID);
    assert_eq!(me.role, Role::User);
    assert!(me.is_premium);
}

// --- ADMIN HANDLERS ---

#[tokio::test]
async fn test_admin_handlers_forbidden_for_members() {
    let state = catalog_state();

    let content = handlers::get_admin_content(member_user(), State(state.clone())).await;
    assert_eq!(content.unwrap_err(), StatusCode::FORBIDDEN);

    let stats = handlers::get_admin_stats(member_user(), State(state.clone())).await;
    assert_eq!(stats.unwrap_err(), StatusCode::FORBIDDEN);

    let status = handlers::delete_content(member_user(), State(state.clone()), Path(Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let premium_toggle =
        handlers::set_user_premium(member_user(), State(state), Path(TEST_MEMBER_ID), Json(true)).await;
    assert_eq!(premium_toggle.unwrap_err(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_admin_content_is_ungated() {
    let Json(items) = handlers::get_admin_content(admin_user(), State(catalog_state()))
        .await
        .unwrap();

    assert_eq!(titles(&items), ["Pilates", "Hidratación", "Febrero"]);
}

#[tokio::test]
async fn test_create_content_success() {
    let state = catalog_state();
    let payload = CreateContentRequest {
        title: "  Rutina de fuerza ".to_string(),
        content_type: ContentType::Text,
        text_content: Some("Tres series de diez".to_string()),
        unlock_days: 5,
        ..CreateContentRequest::default()
    };

    let (status, Json(item)) = handlers::create_content(admin_user(), State(state.clone()), Json(payload))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item.title, "Rutina de fuerza");
    assert_eq!(item.created_by, Some(TEST_ADMIN_ID));
    // Not locked, so the delay is dropped; release defaults to the clock's date.
    assert_eq!(item.unlock_days, 0);
    assert_eq!(item.release_date, Some(date(2025, 1, 10)));

    assert_eq!(state.repo.list_content().await.len(), 4);
}

#[tokio::test]
async fn test_create_content_invalid_is_bad_request() {
    let payload = CreateContentRequest {
        title: "Video sin archivo".to_string(),
        content_type: ContentType::Video,
        ..CreateContentRequest::default()
    };

    let result = handlers::create_content(admin_user(), State(catalog_state()), Json(payload)).await;
    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_content() {
    let item = text_item("Borrar");
    let state = state_with(MemoryRepo::with(vec![item.clone()], vec![]), at(2025, 1, 10, 0));

    let status = handlers::delete_content(admin_user(), State(state.clone()), Path(item.id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let again = handlers::delete_content(admin_user(), State(state), Path(item.id)).await;
    assert_eq!(again, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_admin_stats() {
    let profiles = vec![profile("admin", false), profile("user", true), profile("user", false)];
    let state = state_with(MemoryRepo::with(catalog(), profiles), at(2025, 1, 10, 0));

    let Json(stats) = handlers::get_admin_stats(admin_user(), State(state)).await.unwrap();

    assert_eq!(stats.total_content, 3);
    assert_eq!(stats.premium_content, 1);
    assert_eq!(stats.locked_content, 0);
    assert_eq!(stats.scheduled_content, 1);
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.premium_users, 1);
}

#[tokio::test]
async fn test_set_user_premium() {
    let member: Profile = profile("user", false);
    let state = state_with(MemoryRepo::with(vec![], vec![member.clone()]), at(2025, 1, 10, 0));

    let Json(updated) =
        handlers::set_user_premium(admin_user(), State(state.clone()), Path(member.id), Json(true))
            .await
            .unwrap();
    assert!(updated.is_premium);

    let missing =
        handlers::set_user_premium(admin_user(), State(state), Path(Uuid::new_v4()), Json(true)).await;
    assert_eq!(missing.unwrap_err(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_presigned_url_success() {
    let state = catalog_state();
    let payload = PresignedUrlRequest {
        filename: "guia_nutricion.pdf".to_string(),
        file_type: "application/pdf".to_string(),
        content_type: ContentType::Pdf,
    };

    let response = handlers::get_presigned_url(admin_user(), State(state), Json(payload))
        .await
        .into_response();
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let body_json: PresignedUrlResponse = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(parts.status, StatusCode::OK);
    assert!(body_json.upload_url.starts_with("http://localhost:9000/mock-bucket/"));
    assert!(body_json.upload_url.contains(&body_json.resource_key));
    assert!(body_json.resource_key.starts_with("uploads/"));
    assert!(body_json.resource_key.ends_with(".pdf"));
    assert_eq!(
        body_json.public_url,
        format!("http://localhost:9000/mock-bucket/{}", body_json.resource_key)
    );
}

#[tokio::test]
async fn test_get_presigned_url_ignores_unsafe_extension() {
    let payload = PresignedUrlRequest {
        filename: "clip.mp4#frag".to_string(),
        file_type: "video/mp4".to_string(),
        content_type: ContentType::Video,
    };

    let response = handlers::get_presigned_url(admin_user(), State(catalog_state()), Json(payload))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body_json: PresignedUrlResponse = serde_json::from_slice(&bytes).unwrap();

    assert!(body_json.resource_key.ends_with(".bin"), "{}", body_json.resource_key);
    assert!(!body_json.public_url.contains('#'));
}

#[test]
fn test_object_extension() {
    assert_eq!(handlers::object_extension("Foto.JPG"), "jpg");
    assert_eq!(handlers::object_extension("guia.v2.pdf"), "pdf");
    assert_eq!(handlers::object_extension("notas"), "bin");
    assert_eq!(handlers::object_extension("clip.mp4?x=1"), "bin");
    assert_eq!(handlers::object_extension("a.mi archivo"), "bin");
    assert_eq!(handlers::object_extension("archivo.extensionlarga"), "bin");
}

#[tokio::test]
async fn test_create_content_with_oversized_unlock_days_is_bad_request() {
    let payload = CreateContentRequest {
        title: "Reto eterno".to_string(),
        content_type: ContentType::Text,
        text_content: Some("Un día a la vez".to_string()),
        is_locked: true,
        unlock_days: u32::MAX,
        ..CreateContentRequest::default()
    };

    let result = handlers::create_content(admin_user(), State(catalog_state()), Json(payload)).await;
    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_presigned_url_rejects_mismatched_mime() {
    let payload = PresignedUrlRequest {
        filename: "clip.mp4".to_string(),
        file_type: "video/mp4".to_string(),
        content_type: ContentType::Image,
    };

    let response = handlers::get_presigned_url(admin_user(), State(catalog_state()), Json(payload))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_presigned_url_storage_failure() {
    let mut state = catalog_state();
    state.storage = std::sync::Arc::new(MockStorageService::new_failing()) as StorageState;
    let payload = PresignedUrlRequest {
        filename: "foto.png".to_string(),
        file_type: "image/png".to_string(),
        content_type: ContentType::Image,
    };

    let response = handlers::get_presigned_url(admin_user(), State(state), Json(payload))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
