use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{ActionResult, PostDetail, PostFilter, PostInput},
    storage,
};

use super::require_text;

/// list_posts
///
/// [Admin Route] Posts in every status. `status=trash` shows the trash;
/// otherwise trashed posts are hidden unless `include_deleted=true`.
#[utoipa::path(
    get,
    path = "/admin/posts",
    params(PostFilter),
    responses((status = 200, description = "Posts", body = [PostDetail]))
)]
pub async fn list_posts(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> Result<Json<Vec<PostDetail>>, AppError> {
    user.require_admin()?;
    Ok(Json(state.repo.list_posts(&filter).await?))
}

/// get_post
#[utoipa::path(
    get,
    path = "/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post", body = PostDetail),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostDetail>, AppError> {
    user.require_admin()?;
    state
        .repo
        .get_post(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Post"))
}

/// create_post
///
/// [Admin Route] Creates a post with its category and tag links. The author
/// defaults to the caller; unknown tag names are created on the fly.
#[utoipa::path(
    post,
    path = "/admin/posts",
    request_body = PostInput,
    responses(
        (status = 201, description = "Created", body = PostDetail),
        (status = 409, description = "Slug already taken")
    )
)]
pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<PostInput>,
) -> Result<(StatusCode, Json<PostDetail>), AppError> {
    user.require_admin()?;
    require_text("title", &input.title)?;

    let detail = state.repo.create_post(input, user.id).await?;
    tracing::info!(post_id = %detail.post.id, slug = %detail.post.slug, "post created");
    Ok((StatusCode::CREATED, Json(detail)))
}

/// update_post
///
/// [Admin Route] Replaces the post's fields. Category and tag links are only
/// rewritten when `category_ids` / `tags` are present in the payload.
#[utoipa::path(
    put,
    path = "/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = PostInput,
    responses(
        (status = 200, description = "Updated", body = PostDetail),
        (status = 404, description = "Not found"),
        (status = 409, description = "Slug already taken")
    )
)]
pub async fn update_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<PostInput>,
) -> Result<Json<PostDetail>, AppError> {
    user.require_admin()?;
    require_text("title", &input.title)?;

    let detail = state
        .repo
        .update_post(id, input)
        .await?
        .ok_or(AppError::NotFound("Post"))?;
    tracing::info!(post_id = %id, status = %detail.post.status, "post updated");
    Ok(Json(detail))
}

/// trash_post
///
/// [Admin Route] Soft delete: the post moves to the trash as a draft.
#[utoipa::path(
    delete,
    path = "/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Moved to trash", body = ActionResult),
        (status = 404, description = "Not found")
    )
)]
pub async fn trash_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResult>, AppError> {
    user.require_admin()?;
    if !state.repo.trash_post(id).await? {
        return Err(AppError::NotFound("Post"));
    }
    Ok(Json(ActionResult::ok("Post moved to trash")))
}

/// restore_post
///
/// [Admin Route] Takes a post out of the trash. It comes back as a draft.
#[utoipa::path(
    post,
    path = "/admin/posts/{id}/restore",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Restored", body = ActionResult),
        (status = 404, description = "Not found")
    )
)]
pub async fn restore_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResult>, AppError> {
    user.require_admin()?;
    if !state.repo.restore_post(id).await? {
        return Err(AppError::NotFound("Post"));
    }
    Ok(Json(ActionResult::ok("Post restored as draft")))
}

/// delete_post_permanently
///
/// [Admin Route] Removes the post for good, then its images from storage.
/// A storage failure is logged but does not undo the delete.
#[utoipa::path(
    delete,
    path = "/admin/posts/{id}/permanent",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_post_permanently(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require_admin()?;
    let detail = state
        .repo
        .get_post(id)
        .await?
        .ok_or(AppError::NotFound("Post"))?;

    if !state.repo.delete_post(id).await? {
        return Err(AppError::NotFound("Post"));
    }

    let public_base = state.storage.public_url("");
    let images = [detail.post.featured_image_url, detail.post.gallery_image_url];
    for url in images.iter().flatten() {
        let Some(key) = storage::key_from_public_url(&public_base, url) else {
            continue;
        };
        if let Err(e) = state.storage.delete_object(&key).await {
            tracing::warn!(post_id = %id, key = %key, error = %e, "failed to remove post image");
        }
    }

    tracing::info!(post_id = %id, "post permanently deleted");
    Ok(StatusCode::NO_CONTENT)
}
