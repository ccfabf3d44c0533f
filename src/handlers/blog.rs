use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{self, AuthUser},
    error::AppError,
    models::{
        ActionResult, CategoryWithCount, Comment, CreateCommentRequest, HomePage, LikeStatus,
        MaintenancePage, PostDetail, PostFilter, SiteSettings, TagWithCount,
    },
};

use super::{require_email, require_text};

/// Number of posts on the home page.
const HOME_POSTS: i64 = 6;

/// BlogQuery
///
/// Accepted query parameters for the public post listing (GET /blog).
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BlogQuery {
    /// Case-insensitive match on the post title.
    pub search: Option<String>,
    /// Category slug.
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ViewCount {
    pub view_count: i32,
}

async fn site_settings(state: &AppState) -> Result<SiteSettings, AppError> {
    Ok(state.repo.get_settings().await?.unwrap_or_default())
}

/// A published, non-trashed post, or 404.
async fn live_post(state: &AppState, id: Uuid) -> Result<PostDetail, AppError> {
    state
        .repo
        .get_post(id)
        .await?
        .filter(|detail| detail.post.is_live())
        .ok_or(AppError::NotFound("Post"))
}

/// home
///
/// [Public Route] Latest published posts and the category list.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Home page", body = HomePage))
)]
pub async fn home(State(state): State<AppState>) -> Result<Json<HomePage>, AppError> {
    let settings = site_settings(&state).await?;
    let latest_posts = state
        .repo
        .list_posts(&PostFilter {
            limit: Some(HOME_POSTS),
            ..PostFilter::published()
        })
        .await?;
    let categories = state.repo.list_categories().await?;

    Ok(Json(HomePage {
        site_name: settings.site_name.unwrap_or_default(),
        latest_posts,
        categories,
    }))
}

/// list_posts
///
/// [Public Route] Published posts, newest first, optionally filtered by title
/// search and category slug.
#[utoipa::path(
    get,
    path = "/blog",
    params(BlogQuery),
    responses((status = 200, description = "Published posts", body = [PostDetail]))
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<BlogQuery>,
) -> Result<Json<Vec<PostDetail>>, AppError> {
    let filter = PostFilter {
        search: query.search,
        category: query.category,
        ..PostFilter::published()
    };
    Ok(Json(state.repo.list_posts(&filter).await?))
}

/// get_post
///
/// [Public Route] One published post by slug, with author, categories and tags.
#[utoipa::path(
    get,
    path = "/blog/{post}",
    params(("post" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post", body = PostDetail),
        (status = 404, description = "Not found or not published")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetail>, AppError> {
    state
        .repo
        .get_published_post_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Post"))
}

/// record_view
///
/// [Public Route] Increments the view counter of a published post.
#[utoipa::path(
    post,
    path = "/blog/{post}/views",
    params(("post" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "New view count", body = ViewCount),
        (status = 404, description = "Not found or not published")
    )
)]
pub async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ViewCount>, AppError> {
    state
        .repo
        .increment_view_count(id)
        .await?
        .map(|view_count| Json(ViewCount { view_count }))
        .ok_or(AppError::NotFound("Post"))
}

/// list_comments
///
/// [Public Route] Approved comments of a post, oldest first.
#[utoipa::path(
    get,
    path = "/blog/{post}/comments",
    params(("post" = Uuid, Path, description = "Post ID")),
    responses((status = 200, description = "Approved comments", body = [Comment]))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, AppError> {
    Ok(Json(state.repo.list_approved_comments(id).await?))
}

/// add_comment
///
/// [Public Route] Leaves an anonymous comment. It is stored as `pending` and
/// only shows up once a moderator approves it.
#[utoipa::path(
    post,
    path = "/blog/{post}/comments",
    params(("post" = Uuid, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment awaiting moderation", body = ActionResult),
        (status = 400, description = "Invalid input or comments disabled"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<ActionResult>), AppError> {
    require_text("name", &payload.name)?;
    require_email(&payload.email)?;
    require_text("content", &payload.content)?;

    let detail = live_post(&state, id).await?;
    if !detail.post.allow_comments {
        return Err(AppError::BadRequest(
            "Comments are disabled for this post".to_string(),
        ));
    }

    let comment = state.repo.create_comment(id, payload).await?;
    tracing::info!(comment_id = %comment.id, post_id = %id, "comment submitted");

    Ok((
        StatusCode::CREATED,
        Json(ActionResult::ok(
            "Comment submitted successfully! It will appear once approved.",
        )),
    ))
}

/// like_status
///
/// [Public Route] Like count, plus whether the caller (if signed in) liked the post.
#[utoipa::path(
    get,
    path = "/blog/{post}/likes",
    params(("post" = Uuid, Path, description = "Post ID")),
    responses((status = 200, description = "Like status", body = LikeStatus))
)]
pub async fn like_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<LikeStatus>, AppError> {
    let viewer = auth::resolve_identity(&headers, &state.config);
    Ok(Json(state.repo.like_status(id, viewer).await?))
}

/// toggle_like
///
/// [Authenticated Route] Likes the post, or removes the like if already given.
#[utoipa::path(
    post,
    path = "/blog/{post}/like",
    params(("post" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "New like status", body = LikeStatus),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn toggle_like(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeStatus>, AppError> {
    live_post(&state, id).await?;
    Ok(Json(state.repo.toggle_like(id, user_id).await?))
}

/// list_categories
///
/// [Public Route] All categories with their post counts.
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "Categories", body = [CategoryWithCount]))
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithCount>>, AppError> {
    Ok(Json(state.repo.list_categories().await?))
}

/// list_tags
#[utoipa::path(
    get,
    path = "/tags",
    responses((status = 200, description = "Tags", body = [TagWithCount]))
)]
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagWithCount>>, AppError> {
    Ok(Json(state.repo.list_tags().await?))
}

/// maintenance_page
///
/// [Public Route] Holding page shown while the site is in maintenance mode.
/// The request gate sends visitors here, and away from here once the mode is off.
#[utoipa::path(
    get,
    path = "/maintenance",
    responses((status = 200, description = "Maintenance notice", body = MaintenancePage))
)]
pub async fn maintenance_page(
    State(state): State<AppState>,
) -> Result<Json<MaintenancePage>, AppError> {
    let settings = site_settings(&state).await?;
    Ok(Json(MaintenancePage {
        site_name: settings.site_name.unwrap_or_default(),
        message: "We are performing scheduled maintenance. Please check back soon.".to_string(),
    }))
}
