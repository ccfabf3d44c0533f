use crate::{
    AppState,
    handlers::{blog, session},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints any client may call. Blog reads only ever return published,
/// non-trashed posts; that filter lives in the handlers and repository.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check. Not seen by the request gate.
        .route("/health", get(|| async { "ok" }))
        // --- Blog ---
        .route("/", get(blog::home))
        .route("/blog", get(blog::list_posts))
        // `{post}` is the slug here and the post id on the sub-routes below;
        // the router needs one capture name per segment.
        .route("/blog/{post}", get(blog::get_post))
        .route("/blog/{post}/views", post(blog::record_view))
        .route(
            "/blog/{post}/comments",
            get(blog::list_comments).post(blog::add_comment),
        )
        .route("/blog/{post}/likes", get(blog::like_status))
        .route("/categories", get(blog::list_categories))
        .route("/tags", get(blog::list_tags))
        .route("/maintenance", get(blog::maintenance_page))
        // --- Auth pages & session ---
        .route("/login", get(session::login_page).post(session::login))
        .route("/register", get(session::register_page).post(session::register))
        .route("/logout", post(session::logout))
        .route("/forgot-password", post(session::forgot_password))
}
