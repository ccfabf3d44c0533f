use crate::{
    AppState,
    handlers::{blog, media, profile, session},
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes for any signed-in user, whatever the role. The router is wrapped in
/// the `auth_middleware` layer by `create_router`, so an unauthenticated call
/// is answered with 401 before a handler runs.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/PUT /me
        .route("/me", get(profile::get_me).put(profile::update_me))
        .route("/me/avatar", put(profile::set_avatar))
        .route("/me/password", post(session::change_password))
        // POST /update-password
        // Second half of the recovery flow started at /forgot-password.
        .route("/update-password", post(session::update_password))
        // POST /blog/{post}/like
        .route("/blog/{post}/like", post(blog::toggle_like))
        // POST /upload/presigned
        // Short-lived (10-minute) upload URL straight to storage.
        .route("/upload/presigned", post(media::get_presigned_url))
}
