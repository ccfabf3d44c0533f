use crate::{
    AppState,
    handlers::{comments, dashboard, media, posts, profile, session, settings, taxonomy, users},
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// The back office, nested under `/admin`. The request gate already redirects
/// anonymous and non-admin callers to `/login`; every handler here still calls
/// `AuthUser::require_admin` so the routes are safe on their own.
///
/// Own-profile, upload and logout endpoints are mounted here as well as at
/// the site root: maintenance mode closes everything outside `/admin`, and
/// the back office must keep working while it is on.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/analytics", get(dashboard::get_analytics))
        // --- Posts ---
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::trash_post),
        )
        .route("/posts/{id}/restore", post(posts::restore_post))
        .route("/posts/{id}/permanent", delete(posts::delete_post_permanently))
        // --- Taxonomy ---
        .route(
            "/categories",
            get(taxonomy::list_categories).post(taxonomy::create_category),
        )
        .route(
            "/categories/{id}",
            get(taxonomy::get_category)
                .put(taxonomy::update_category)
                .delete(taxonomy::delete_category),
        )
        .route("/tags", get(taxonomy::list_tags).post(taxonomy::create_tag))
        .route(
            "/tags/{id}",
            get(taxonomy::get_tag)
                .put(taxonomy::update_tag)
                .delete(taxonomy::delete_tag),
        )
        // --- Moderation ---
        .route("/comments", get(comments::list_comments))
        .route("/comments/{id}", delete(comments::delete_comment))
        .route("/comments/{id}/status", put(comments::set_comment_status))
        // --- Users ---
        .route("/users", get(users::list_users).post(users::invite_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // --- Media & settings ---
        .route("/media", get(media::list_media))
        .route("/media/{*key}", delete(media::delete_media))
        .route(
            "/settings",
            get(settings::get_settings).put(settings::save_settings),
        )
        .route("/upload/presigned", post(media::get_presigned_url))
        // --- Own account ---
        .route("/profile", get(profile::get_me).put(profile::update_me))
        .route("/profile/avatar", put(profile::set_avatar))
        .route("/profile/password", post(session::change_password))
        .route("/logout", post(session::logout))
}
