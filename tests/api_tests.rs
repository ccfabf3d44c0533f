use blog_cms::{
    AppConfig, AppState, GateState, InMemoryRepository, MockAuthProvider, MockStorageService,
    create_router,
    models::{PostInput, PostStatus},
    repository::Repository,
};
use reqwest::{StatusCode, header, redirect};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepository>,
    pub client: reqwest::Client,
}

/// Serves the full router on a random port, so the gate is exercised over real HTTP.
async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState {
        repo: repo.clone(),
        gate: GateState::new(repo.clone(), repo.clone()),
        storage: Arc::new(MockStorageService::new()),
        auth: Arc::new(MockAuthProvider::new()),
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Redirects are asserted, not followed.
    let client = reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address,
        repo,
        client,
    }
}

impl TestApp {
    async fn get(&self, path: &str, user: Option<Uuid>) -> reqwest::Response {
        let mut request = self.client.get(format!("{}{}", self.address, path));
        if let Some(user_id) = user {
            request = request.header("x-user-id", user_id.to_string());
        }
        request.send().await.expect("req fail")
    }
}

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app.get("/health", None).await;

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let response = app.get("/api-docs/openapi.json", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let doc: serde_json::Value = response.json().await.unwrap();
    assert!(doc["paths"]["/blog/{post}"].is_object());
    assert!(doc["paths"]["/admin/settings"].is_object());
}

#[tokio::test]
async fn test_anonymous_admin_visit_is_redirected_to_login() {
    let app = spawn_app().await;
    let response = app.get("/admin/dashboard", None).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login?error=authentication_required");
}

#[tokio::test]
async fn test_subscriber_admin_visit_is_redirected_with_marker() {
    let app = spawn_app().await;
    let reader = Uuid::new_v4();
    app.repo.seed_profile(reader, "Reader", "subscriber").await;

    let response = app.get("/admin/posts", Some(reader)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login?error=admin_access_required");

    // Following the redirect by hand: the marked login page is shown.
    let login = app.get(location(&response), Some(reader)).await;
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_maintenance_round_trip() {
    let app = spawn_app().await;
    let admin = Uuid::new_v4();
    app.repo.seed_profile(admin, "Admin", "admin").await;
    app.repo
        .create_post(
            PostInput {
                title: "Launch".to_string(),
                status: PostStatus::Published,
                allow_comments: true,
                ..PostInput::default()
            },
            admin,
        )
        .await
        .unwrap();

    app.repo.seed_maintenance_mode(true).await;
    let response = app.get("/blog/launch", None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/maintenance");
    assert_eq!(app.get("/maintenance", None).await.status(), StatusCode::OK);
    assert_eq!(app.get("/admin/dashboard", Some(admin)).await.status(), StatusCode::OK);

    app.repo.seed_maintenance_mode(false).await;
    let response = app.get("/maintenance", None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/");
    assert_eq!(app.get("/blog/launch", None).await.status(), StatusCode::OK);
}
