use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use blog_cms::{
    AppConfig, AppState, GateState, InMemoryRepository, MockAuthProvider, MockStorageService,
    auth::Claims,
    create_router,
    error::RepoError,
    gate::{ProfileStore, SettingsStore},
    repository::RepositoryState,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tower::util::ServiceExt;
use uuid::Uuid;

// --- Stub stores ---

/// Every lookup fails, as if the database were unreachable.
struct UnreachableStore;

#[async_trait]
impl ProfileStore for UnreachableStore {
    async fn role_of(&self, _user_id: Uuid) -> Result<Option<String>, RepoError> {
        Err(RepoError::Unavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl SettingsStore for UnreachableStore {
    async fn maintenance_mode(&self) -> Result<Option<bool>, RepoError> {
        Err(RepoError::Unavailable("connection refused".to_string()))
    }
}

/// Answers "admin" and "maintenance on", but far too late.
struct SlowStore;

#[async_trait]
impl ProfileStore for SlowStore {
    async fn role_of(&self, _user_id: Uuid) -> Result<Option<String>, RepoError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Some("admin".to_string()))
    }
}

#[async_trait]
impl SettingsStore for SlowStore {
    async fn maintenance_mode(&self) -> Result<Option<bool>, RepoError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Some(true))
    }
}

// --- Helpers ---

fn app_with(repo: Arc<InMemoryRepository>, gate: GateState, config: AppConfig) -> Router {
    let state = AppState {
        repo: repo as RepositoryState,
        storage: Arc::new(MockStorageService::new()),
        auth: Arc::new(MockAuthProvider::new()),
        gate,
        config,
    };
    create_router(state)
}

/// The in-memory repository serves the handlers and both gate stores.
fn app(repo: &Arc<InMemoryRepository>) -> Router {
    let gate = GateState::new(repo.clone(), repo.clone());
    app_with(repo.clone(), gate, AppConfig::default())
}

async fn get(app: Router, uri: &str, user: Option<Uuid>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(id) = user {
        builder = builder.header("x-user-id", id.to_string());
    }
    app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
}

async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    user: Uuid,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

fn assert_redirect(response: &Response<Body>, expected: &str) {
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(response), Some(expected));
}

fn token_for(user_id: Uuid, secret: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + 3600,
        email: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

// --- Admin routes ---

#[tokio::test]
async fn test_anonymous_admin_request_redirects_to_login() {
    let repo = Arc::new(InMemoryRepository::new());
    let response = get(app(&repo), "/admin/users", None).await;
    assert_redirect(&response, "/login?error=authentication_required");
}

#[tokio::test]
async fn test_editor_is_redirected_with_admin_access_required() {
    let repo = Arc::new(InMemoryRepository::new());
    let editor = Uuid::new_v4();
    repo.seed_profile(editor, "Eddie", "editor").await;

    let response = get(app(&repo), "/admin/users", Some(editor)).await;
    assert_redirect(&response, "/login?error=admin_access_required");
}

#[tokio::test]
async fn test_super_admin_with_mixed_case_role_reaches_admin_handler() {
    let repo = Arc::new(InMemoryRepository::new());
    let boss = Uuid::new_v4();
    repo.seed_profile(boss, "Boss", "Super Admin").await;

    let response = get(app(&repo), "/admin/users", Some(boss)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(location(&response).is_none());
}

#[tokio::test]
async fn test_near_miss_role_spellings_are_kept_out() {
    let repo = Arc::new(InMemoryRepository::new());
    for raw in ["super_admin", " admin", "superadmin"] {
        let user = Uuid::new_v4();
        repo.seed_profile(user, "Almost", raw).await;

        let response = get(app(&repo), "/admin/users", Some(user)).await;
        assert_redirect(&response, "/login?error=admin_access_required");
    }
}

#[tokio::test]
async fn test_signed_in_user_without_profile_is_not_admin() {
    let repo = Arc::new(InMemoryRepository::new());
    let response = get(app(&repo), "/admin/dashboard", Some(Uuid::new_v4())).await;
    assert_redirect(&response, "/login?error=admin_access_required");
}

#[tokio::test]
async fn test_bearer_token_identifies_admin() {
    let repo = Arc::new(InMemoryRepository::new());
    let admin = Uuid::new_v4();
    repo.seed_profile(admin, "Ada", "admin").await;
    let config = AppConfig::default();
    let token = token_for(admin, &config.jwt_secret);

    let response = app(&repo)
        .oneshot(
            Request::builder()
                .uri("/admin/dashboard")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_signed_with_another_secret_is_anonymous() {
    let repo = Arc::new(InMemoryRepository::new());
    let admin = Uuid::new_v4();
    repo.seed_profile(admin, "Ada", "admin").await;
    let token = token_for(admin, "some-other-projects-secret");

    let response = app(&repo)
        .oneshot(
            Request::builder()
                .uri("/admin/dashboard")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_redirect(&response, "/login?error=authentication_required");
}

// --- Login / register ---

#[tokio::test]
async fn test_session_cookie_subscriber_is_sent_home_from_login() {
    let repo = Arc::new(InMemoryRepository::new());
    let reader = Uuid::new_v4();
    repo.seed_profile(reader, "Reader", "subscriber").await;
    let token = token_for(reader, &AppConfig::default().jwt_secret);

    let response = app(&repo)
        .oneshot(
            Request::builder()
                .uri("/login")
                .header(header::COOKIE, format!("theme=dark; sb-access-token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_redirect(&response, "/");
}

#[tokio::test]
async fn test_signed_in_admin_is_sent_to_dashboard_from_register() {
    let repo = Arc::new(InMemoryRepository::new());
    let admin = Uuid::new_v4();
    repo.seed_profile(admin, "Ada", "admin").await;

    let response = get(app(&repo), "/register", Some(admin)).await;
    assert_redirect(&response, "/admin/dashboard");
}

#[tokio::test]
async fn test_rejected_session_may_still_open_login() {
    let repo = Arc::new(InMemoryRepository::new());
    let editor = Uuid::new_v4();
    repo.seed_profile(editor, "Eddie", "editor").await;

    let response = get(app(&repo), "/login?error=admin_access_required", Some(editor)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let notice: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(
        notice["notice"]
            .as_str()
            .is_some_and(|text| text.contains("admin privileges"))
    );
}

#[tokio::test]
async fn test_anonymous_visitor_sees_login() {
    let repo = Arc::new(InMemoryRepository::new());
    let response = get(app(&repo), "/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// --- Maintenance mode ---

#[tokio::test]
async fn test_maintenance_redirects_public_pages() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.seed_maintenance_mode(true).await;

    for uri in ["/", "/blog", "/blog/my-post", "/categories"] {
        let response = get(app(&repo), uri, None).await;
        assert_redirect(&response, "/maintenance");
    }
}

#[tokio::test]
async fn test_maintenance_redirects_signed_in_admin_on_public_pages() {
    let repo = Arc::new(InMemoryRepository::new());
    let admin = Uuid::new_v4();
    repo.seed_profile(admin, "Ada", "admin").await;
    repo.seed_maintenance_mode(true).await;

    let response = get(app(&repo), "/blog/my-post", Some(admin)).await;
    assert_redirect(&response, "/maintenance");
}

#[tokio::test]
async fn test_maintenance_keeps_admin_and_auth_routes_open() {
    let repo = Arc::new(InMemoryRepository::new());
    let admin = Uuid::new_v4();
    repo.seed_profile(admin, "Ada", "admin").await;
    repo.seed_maintenance_mode(true).await;

    let dashboard = get(app(&repo), "/admin/dashboard", Some(admin)).await;
    assert_eq!(dashboard.status(), StatusCode::OK);

    let login = get(app(&repo), "/login", None).await;
    assert_eq!(login.status(), StatusCode::OK);

    let page = get(app(&repo), "/maintenance", None).await;
    assert_eq!(page.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_maintenance_lets_static_assets_through() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.seed_maintenance_mode(true).await;

    // No route serves it, but the gate must not redirect it either.
    let response = get(app(&repo), "/images/logo.png", None).await;
    assert_ne!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).is_none());
}

#[tokio::test]
async fn test_stale_maintenance_bookmark_redirects_home() {
    let repo = Arc::new(InMemoryRepository::new());
    let response = get(app(&repo), "/maintenance", None).await;
    assert_redirect(&response, "/");
}

#[tokio::test]
async fn test_missing_settings_row_means_site_is_open() {
    let repo = Arc::new(InMemoryRepository::new());
    let response = get(app(&repo), "/blog", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_and_api_docs_are_never_gated() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.seed_maintenance_mode(true).await;

    let health = get(app(&repo), "/health", None).await;
    assert_eq!(health.status(), StatusCode::OK);

    let docs = get(app(&repo), "/api-docs/openapi.json", None).await;
    assert_eq!(docs.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ungated_prefixes_match_whole_segments() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.seed_maintenance_mode(true).await;

    for path in ["/healthy-recipes", "/health-tips", "/api-docsumentary"] {
        let response = get(app(&repo), path, None).await;
        assert_redirect(&response, "/maintenance");
    }
}

#[tokio::test]
async fn test_admin_account_tools_work_during_maintenance() {
    let repo = Arc::new(InMemoryRepository::new());
    let admin = Uuid::new_v4();
    repo.seed_profile(admin, "Ada", "admin").await;
    repo.seed_maintenance_mode(true).await;

    let upload = send_json(
        app(&repo),
        "POST",
        "/admin/upload/presigned",
        admin,
        serde_json::json!({ "filename": "cover.png", "file_type": "image/png", "folder": "posts" }),
    )
    .await;
    assert_eq!(upload.status(), StatusCode::OK);

    let profile = get(app(&repo), "/admin/profile", Some(admin)).await;
    assert_eq!(profile.status(), StatusCode::OK);

    let avatar = send_json(
        app(&repo),
        "PUT",
        "/admin/profile/avatar",
        admin,
        serde_json::json!({ "avatar_url": "http://localhost:9000/BlogCMS/avatars/ada.png" }),
    )
    .await;
    assert_eq!(avatar.status(), StatusCode::OK);

    let logout = send_json(app(&repo), "POST", "/admin/logout", admin, serde_json::json!({})).await;
    assert_eq!(logout.status(), StatusCode::OK);
    let cookie = logout
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.contains("Max-Age=0"));

    // The site-root variants stay closed while maintenance is on.
    let public_logout = send_json(app(&repo), "POST", "/logout", admin, serde_json::json!({})).await;
    assert_redirect(&public_logout, "/maintenance");
}

#[tokio::test]
async fn test_admin_account_tools_are_admin_only() {
    let repo = Arc::new(InMemoryRepository::new());
    let reader = Uuid::new_v4();
    repo.seed_profile(reader, "Reader", "subscriber").await;

    let response = get(app(&repo), "/admin/profile", Some(reader)).await;
    assert_redirect(&response, "/login?error=admin_access_required");
}

#[tokio::test]
async fn test_saving_settings_turns_maintenance_on_for_the_next_request() {
    let repo = Arc::new(InMemoryRepository::new());
    let admin = Uuid::new_v4();
    repo.seed_profile(admin, "Ada", "admin").await;

    let before = get(app(&repo), "/", None).await;
    assert_eq!(before.status(), StatusCode::OK);

    let save = app(&repo)
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/admin/settings")
                .header("x-user-id", admin.to_string())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "site_name": "Closed Blog", "maintenance_mode": true })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(save.status(), StatusCode::OK);

    let after = get(app(&repo), "/", None).await;
    assert_redirect(&after, "/maintenance");
}

// --- Store failures ---

#[tokio::test]
async fn test_unreachable_stores_fail_safe() {
    let repo = Arc::new(InMemoryRepository::new());
    let admin = Uuid::new_v4();
    repo.seed_profile(admin, "Ada", "admin").await;
    // The real settings say maintenance is on; the gate cannot see them.
    repo.seed_maintenance_mode(true).await;
    let gate = GateState::new(Arc::new(UnreachableStore), Arc::new(UnreachableStore));
    let app = app_with(repo, gate, AppConfig::default());

    // Maintenance falls back to off: the site stays available.
    let blog = get(app.clone(), "/blog", None).await;
    assert_eq!(blog.status(), StatusCode::OK);

    // The role falls back to none: admin access is never granted.
    let dashboard = get(app, "/admin/dashboard", Some(admin)).await;
    assert_redirect(&dashboard, "/login?error=admin_access_required");
}

#[tokio::test]
async fn test_slow_stores_time_out_to_safe_defaults() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = Uuid::new_v4();
    repo.seed_profile(user, "Ada", "admin").await;
    let gate = GateState::new(Arc::new(SlowStore), Arc::new(SlowStore));
    let config = AppConfig {
        gate_lookup_timeout: Duration::from_millis(50),
        ..AppConfig::default()
    };
    let app = app_with(repo, gate, config);

    let blog = get(app.clone(), "/blog", None).await;
    assert_eq!(blog.status(), StatusCode::OK);

    let dashboard = get(app, "/admin/dashboard", Some(user)).await;
    assert_redirect(&dashboard, "/login?error=admin_access_required");
}

#[tokio::test]
async fn test_role_lookup_is_skipped_for_ordinary_pages() {
    // A profile store that would hang forever is never consulted for /blog.
    let repo = Arc::new(InMemoryRepository::new());
    let gate = GateState::new(Arc::new(SlowStore), repo.clone());
    let config = AppConfig {
        gate_lookup_timeout: Duration::from_secs(30),
        ..AppConfig::default()
    };
    let app = app_with(repo, gate, config);

    let response = tokio::time::timeout(
        Duration::from_secs(2),
        get(app, "/blog", Some(Uuid::new_v4())),
    )
    .await
    .expect("gate waited on a role lookup it did not need");
    assert_eq!(response.status(), StatusCode::OK);
}
