use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, Method, Request, StatusCode, Uri, header, request::Parts},
};
use blog_cms::{
    AppState, GateState, InMemoryRepository, MockAuthProvider, MockStorageService,
    auth::{AuthUser, Claims, access_token, decode_token, resolve_identity},
    config::{AppConfig, Env},
    role::Role,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Test Constants ---

const TEST_JWT_SECRET: &str = "a-very-secure-test-secret-for-jwt-validation";
const TEST_USER_ID: Uuid = Uuid::from_u128(0x1234_5678_90ab_cdef_1234_5678_90ab_cdef);

// --- Helpers ---

/// Signs a token for `user_id` expiring `exp_offset` seconds from now (negative: already expired).
fn create_token(user_id: Uuid, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        exp: (now + exp_offset) as usize,
        iat: now as usize,
        email: Some("reader@example.com".to_string()),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

fn config_for(env: Env) -> AppConfig {
    AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

fn create_app_state(env: Env, repo: Arc<InMemoryRepository>) -> AppState {
    AppState {
        gate: GateState::new(repo.clone(), repo.clone()),
        repo,
        storage: Arc::new(MockStorageService::new()),
        auth: Arc::new(MockAuthProvider::new()),
        config: config_for(env),
    }
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(name, header::HeaderValue::from_str(value).unwrap());
    headers
}

// --- Token handling ---

#[test]
fn test_access_token_prefers_bearer_over_cookie() {
    let mut headers = headers_with(header::AUTHORIZATION, "Bearer from-header");
    headers.insert(
        header::COOKIE,
        header::HeaderValue::from_static("sb-access-token=from-cookie"),
    );
    assert_eq!(access_token(&headers).as_deref(), Some("from-header"));
}

#[test]
fn test_access_token_falls_back_to_session_cookie() {
    let headers = headers_with(header::COOKIE, "theme=dark; sb-access-token=abc.def.ghi");
    assert_eq!(access_token(&headers).as_deref(), Some("abc.def.ghi"));

    let cleared = headers_with(header::COOKIE, "sb-access-token=");
    assert_eq!(access_token(&cleared), None);
}

#[test]
fn test_decode_token_checks_signature_and_expiry() {
    let valid = create_token(TEST_USER_ID, 3600);
    let claims = decode_token(&valid, TEST_JWT_SECRET).expect("valid token rejected");
    assert_eq!(claims.sub, TEST_USER_ID);

    assert!(decode_token(&valid, "wrong-secret").is_none());
    assert!(decode_token(&create_token(TEST_USER_ID, -3600), TEST_JWT_SECRET).is_none());
    assert!(decode_token("not-a-jwt", TEST_JWT_SECRET).is_none());
}

#[test]
fn test_resolve_identity_from_bearer_in_production() {
    let token = create_token(TEST_USER_ID, 3600);
    let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", token));
    assert_eq!(
        resolve_identity(&headers, &config_for(Env::Production)),
        Some(TEST_USER_ID)
    );
}

#[test]
fn test_local_bypass_header_is_ignored_in_production() {
    let headers = headers_with(
        header::HeaderName::from_static("x-user-id"),
        &TEST_USER_ID.to_string(),
    );
    assert_eq!(resolve_identity(&headers, &config_for(Env::Local)), Some(TEST_USER_ID));
    assert_eq!(resolve_identity(&headers, &config_for(Env::Production)), None);
}

#[test]
fn test_malformed_bypass_header_is_anonymous() {
    let headers = headers_with(header::HeaderName::from_static("x-user-id"), "not-a-uuid");
    assert_eq!(resolve_identity(&headers, &config_for(Env::Local)), None);
}

// --- AuthUser extractor ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.seed_profile(TEST_USER_ID, "Reader", "subscriber").await;
    let app_state = create_app_state(Env::Production, repo);

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", create_token(TEST_USER_ID, 3600)))
            .unwrap(),
    );

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.role, Role::Subscriber);
    assert!(user.require_admin().is_err());
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(Env::Production, Arc::new(InMemoryRepository::new()));
    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.seed_profile(TEST_USER_ID, "Reader", "subscriber").await;
    let app_state = create_app_state(Env::Production, repo);

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", create_token(TEST_USER_ID, -3600)))
            .unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_without_profile_is_rejected() {
    // e.g. the user was deleted but the token has not expired yet
    let app_state = create_app_state(Env::Production, Arc::new(InMemoryRepository::new()));

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts.headers.insert(
        header::COOKIE,
        header::HeaderValue::from_str(&format!(
            "sb-access-token={}",
            create_token(TEST_USER_ID, 3600)
        ))
        .unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let mock_user_id = Uuid::new_v4();
    let repo = Arc::new(InMemoryRepository::new());
    repo.seed_profile(mock_user_id, "Local Admin", "ADMIN").await;
    let app_state = create_app_state(Env::Local, repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&mock_user_id.to_string()).unwrap(),
    );

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(user.id, mock_user_id);
    assert_eq!(user.role, Role::Admin);
    assert!(user.require_admin().is_ok());
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let mock_user_id = Uuid::new_v4();
    let repo = Arc::new(InMemoryRepository::new());
    repo.seed_profile(mock_user_id, "Local Admin", "admin").await;
    let app_state = create_app_state(Env::Production, repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&mock_user_id.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}
