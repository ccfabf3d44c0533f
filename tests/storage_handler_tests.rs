use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use blog_cms::{
    AppConfig, AppState, GateState, InMemoryRepository, MockAuthProvider, create_router,
    models::{MediaAsset, PostInput, PostStatus, PresignedUrlRequest, PresignedUrlResponse},
    repository::Repository,
    storage::{MOCK_PUBLIC_BASE, MockStorageService},
};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

// --- Helpers ---

fn app(repo: Arc<InMemoryRepository>, storage: MockStorageService) -> Router {
    let state = AppState {
        gate: GateState::new(repo.clone(), repo.clone()),
        repo,
        storage: Arc::new(storage),
        auth: Arc::new(MockAuthProvider::new()),
        config: AppConfig::default(),
    };
    create_router(state)
}

async fn seeded(role: &str) -> (Arc<InMemoryRepository>, Uuid) {
    let repo = Arc::new(InMemoryRepository::new());
    let user_id = Uuid::new_v4();
    repo.seed_profile(user_id, "Uploader", role).await;
    (repo, user_id)
}

async fn request_upload(
    app: Router,
    user_id: Uuid,
    payload: &PresignedUrlRequest,
) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/upload/presigned")
            .header("Content-Type", "application/json")
            .header("x-user-id", user_id.to_string())
            .body(Body::from(serde_json::to_string(payload).unwrap()))
            .unwrap(),
    )
    .await
    .unwrap()
}

fn upload(filename: &str, folder: Option<&str>) -> PresignedUrlRequest {
    PresignedUrlRequest {
        filename: filename.to_string(),
        file_type: "image/png".to_string(),
        folder: folder.map(str::to_string),
    }
}

async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

// --- Presigned uploads ---

#[tokio::test]
async fn test_presigned_url_success() {
    let (repo, admin) = seeded("admin").await;
    let response = request_upload(
        app(repo, MockStorageService::new()),
        admin,
        &upload("Cover.PNG", Some("posts")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: PresignedUrlResponse = json_body(response).await;

    assert!(body.upload_url.contains("signature=fake"));
    assert!(body.resource_key.starts_with("posts/"));
    assert!(body.resource_key.ends_with(".png"));
    assert_eq!(body.public_url, format!("{}/{}", MOCK_PUBLIC_BASE, body.resource_key));
}

#[tokio::test]
async fn test_presigned_url_defaults_to_posts_folder() {
    let (repo, admin) = seeded("admin").await;
    let response = request_upload(app(repo, MockStorageService::new()), admin, &upload("a.jpg", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: PresignedUrlResponse = json_body(response).await;
    assert!(body.resource_key.starts_with("posts/"));
}

#[tokio::test]
async fn test_presigned_url_sanitization() {
    let (repo, admin) = seeded("admin").await;
    let response = request_upload(
        app(repo, MockStorageService::new()),
        admin,
        &upload("../../etc/passwd.exe", Some("posts")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: PresignedUrlResponse = json_body(response).await;

    // The client filename only contributes its extension.
    assert!(body.resource_key.ends_with(".exe"));
    assert!(!body.resource_key.contains(".."));
    assert!(!body.resource_key.contains("passwd"));
}

#[tokio::test]
async fn test_subscriber_may_upload_an_avatar_only() {
    let (repo, reader) = seeded("subscriber").await;

    let avatar = request_upload(
        app(repo.clone(), MockStorageService::new()),
        reader,
        &upload("me.png", Some("avatars")),
    )
    .await;
    assert_eq!(avatar.status(), StatusCode::OK);

    let post_image = request_upload(
        app(repo, MockStorageService::new()),
        reader,
        &upload("cover.png", Some("posts")),
    )
    .await;
    assert_eq!(post_image.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_upload_folder_is_rejected() {
    let (repo, admin) = seeded("admin").await;
    let response = request_upload(
        app(repo, MockStorageService::new()),
        admin,
        &upload("x.png", Some("../secrets")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_presigned_url_requires_sign_in() {
    let repo = Arc::new(InMemoryRepository::new());
    let response = app(repo, MockStorageService::new())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/presigned")
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&upload("a.png", None)).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_presigned_url_storage_failure() {
    let (repo, admin) = seeded("admin").await;
    let response = request_upload(
        app(repo, MockStorageService::new_failing()),
        admin,
        &upload("valid.png", Some("posts")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// --- Media library ---

#[tokio::test]
async fn test_media_library_lists_all_media_folders() {
    let (repo, admin) = seeded("admin").await;
    let storage = MockStorageService::new()
        .with_object("posts/a.png", 100)
        .with_object("categories/tech.svg", 20)
        .with_object("avatars/me.jpg", 30)
        .with_object("backups/dump.sql", 9000);

    let response = app(repo, storage)
        .oneshot(
            Request::builder()
                .uri("/admin/media")
                .header("x-user-id", admin.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let assets: Vec<MediaAsset> = json_body(response).await;
    assert_eq!(assets.len(), 3);

    let cover = assets.iter().find(|a| a.name == "a.png").unwrap();
    assert_eq!(cover.folder, "posts");
    assert_eq!(cover.size_bytes, 100);
    assert_eq!(cover.url, format!("{}/posts/a.png", MOCK_PUBLIC_BASE));
    assert!(assets.iter().all(|a| a.folder != "backups"));
}

#[tokio::test]
async fn test_media_delete_by_key() {
    let (repo, admin) = seeded("admin").await;
    let storage = MockStorageService::new().with_object("posts/a.png", 100);

    let response = app(repo, storage.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/admin/media/posts/a.png")
                .header("x-user-id", admin.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!storage.contains("posts/a.png"));
}

#[tokio::test]
async fn test_media_delete_outside_media_folders_is_rejected() {
    let (repo, admin) = seeded("admin").await;
    let storage = MockStorageService::new().with_object("backups/dump.sql", 1);

    let response = app(repo, storage.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/admin/media/backups/dump.sql")
                .header("x-user-id", admin.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(storage.contains("backups/dump.sql"));
}

#[tokio::test]
async fn test_permanent_post_delete_removes_its_images() {
    let (repo, admin) = seeded("admin").await;
    let storage = MockStorageService::new()
        .with_object("posts/cover.png", 100)
        .with_object("posts/other.png", 100);

    let post = repo
        .create_post(
            PostInput {
                title: "Goodbye".to_string(),
                status: PostStatus::Published,
                featured_image_url: Some(format!("{}/posts/cover.png", MOCK_PUBLIC_BASE)),
                gallery_image_url: Some("https://cdn.example.com/posts/other.png".to_string()),
                allow_comments: true,
                ..PostInput::default()
            },
            admin,
        )
        .await
        .unwrap();

    let response = app(repo.clone(), storage.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/admin/posts/{}/permanent", post.post.id))
                .header("x-user-id", admin.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(repo.get_post(post.post.id).await.unwrap().is_none());
    assert!(!storage.contains("posts/cover.png"));
    // Hosted elsewhere: not ours to delete.
    assert!(storage.contains("posts/other.png"));
}
