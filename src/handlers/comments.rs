use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{Comment, CommentStatus, CommentWithPost, UpdateCommentStatusRequest},
};

/// CommentQuery
///
/// Optional status filter of the moderation queue.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CommentQuery {
    pub status: Option<CommentStatus>,
}

/// list_comments
///
/// [Admin Route] Every comment with the post it was left on, newest first.
#[utoipa::path(
    get,
    path = "/admin/comments",
    params(CommentQuery),
    responses((status = 200, description = "Comments", body = [CommentWithPost]))
)]
pub async fn list_comments(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<CommentQuery>,
) -> Result<Json<Vec<CommentWithPost>>, AppError> {
    user.require_admin()?;
    Ok(Json(state.repo.list_comments(query.status).await?))
}

/// set_comment_status
///
/// [Admin Route] Approve, hold, flag as spam or trash a comment.
#[utoipa::path(
    put,
    path = "/admin/comments/{id}/status",
    params(("id" = Uuid, Path, description = "Comment ID")),
    request_body = UpdateCommentStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 404, description = "Not found")
    )
)]
pub async fn set_comment_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCommentStatusRequest>,
) -> Result<Json<Comment>, AppError> {
    user.require_admin()?;
    let comment = state
        .repo
        .set_comment_status(id, payload.status)
        .await?
        .ok_or(AppError::NotFound("Comment"))?;
    tracing::info!(comment_id = %id, status = payload.status.as_str(), "comment moderated");
    Ok(Json(comment))
}

/// delete_comment
///
/// [Admin Route] Permanent delete.
#[utoipa::path(
    delete,
    path = "/admin/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require_admin()?;
    if state.repo.delete_comment(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Comment"))
    }
}
