use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod auth_provider;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod role;
pub mod storage;

// Routes grouped by caller (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth_provider::{AuthProviderState, MockAuthProvider, SupabaseAuthClient};
pub use config::AppConfig;
pub use gate::GateState;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        // Public site
        handlers::blog::home, handlers::blog::list_posts, handlers::blog::get_post,
        handlers::blog::record_view, handlers::blog::list_comments, handlers::blog::add_comment,
        handlers::blog::like_status, handlers::blog::toggle_like, handlers::blog::list_categories,
        handlers::blog::list_tags, handlers::blog::maintenance_page,
        // Session
        handlers::session::login_page, handlers::session::register_page, handlers::session::login,
        handlers::session::register, handlers::session::logout, handlers::session::forgot_password,
        handlers::session::update_password, handlers::session::change_password,
        // Own profile & uploads
        handlers::profile::get_me, handlers::profile::update_me, handlers::profile::set_avatar,
        handlers::media::get_presigned_url,
        // Back office
        handlers::dashboard::get_dashboard, handlers::dashboard::get_analytics,
        handlers::posts::list_posts, handlers::posts::get_post, handlers::posts::create_post,
        handlers::posts::update_post, handlers::posts::trash_post, handlers::posts::restore_post,
        handlers::posts::delete_post_permanently,
        handlers::taxonomy::list_categories, handlers::taxonomy::get_category,
        handlers::taxonomy::create_category, handlers::taxonomy::update_category,
        handlers::taxonomy::delete_category, handlers::taxonomy::list_tags,
        handlers::taxonomy::get_tag, handlers::taxonomy::create_tag,
        handlers::taxonomy::update_tag, handlers::taxonomy::delete_tag,
        handlers::comments::list_comments, handlers::comments::set_comment_status,
        handlers::comments::delete_comment,
        handlers::users::list_users, handlers::users::get_user, handlers::users::invite_user,
        handlers::users::update_user, handlers::users::delete_user,
        handlers::media::list_media, handlers::media::delete_media,
        handlers::settings::get_settings, handlers::settings::save_settings,
    ),
    components(
        schemas(
            models::Profile, models::UserSummary, models::Post, models::PostStatus,
            models::AuthorSummary, models::CategoryRef, models::PostDetail, models::PostInput,
            models::Category, models::CategoryWithCount, models::CategoryInput,
            models::Tag, models::TagWithCount, models::TagInput,
            models::Comment, models::CommentStatus, models::CreateCommentRequest,
            models::PostRef, models::CommentWithPost, models::UpdateCommentStatusRequest,
            models::LikeStatus, models::SiteSettings, models::SiteSettingsInput,
            models::RecentPost, models::DashboardStats, models::CategoryShare,
            models::TopContent, models::Analytics, models::MediaAsset,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::LoginRequest, models::RegisterRequest, models::ForgotPasswordRequest,
            models::NewPasswordRequest, models::ChangePasswordRequest, models::InviteUserRequest,
            models::UpdateMyProfileRequest, models::UpdateUserRequest, models::AvatarRequest,
            models::RedirectResponse, models::AuthPageNotice, models::ActionResult,
            models::HomePage, models::MaintenancePage, handlers::blog::ViewCount,
        )
    ),
    tags(
        (name = "blog-cms", description = "Blog CMS API: public site and back office")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared state container. Cheap to clone: every service sits
/// behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Posts, taxonomy, comments, profiles and settings.
    pub repo: RepositoryState,
    /// S3-compatible object storage for uploaded media.
    pub storage: StorageState,
    /// Sign-in, sign-up and account administration (Supabase GoTrue).
    pub auth: AuthProviderState,
    /// Read-only stores consulted by the request gate.
    pub gate: GateState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AuthProviderState {
    fn from_ref(app_state: &AppState) -> AuthProviderState {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated routes. Extracting `AuthUser` rejects the request
/// with 401 before the handler runs when the caller cannot be resolved.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routes, the per-group authentication layer, the request gate
/// and the observability stack.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // The gate keeps non-admins out; handlers re-check the role.
        .nest("/admin", admin::admin_routes())
        .with_state(state.clone());

    // 3. Request gate, innermost so its redirects are traced and carry a request id.
    let gated_router =
        base_router.layer(middleware::from_fn_with_state(state, gate::gate_middleware));

    // 4. Observability and Correlation Layers
    gated_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id` set above,
/// so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
