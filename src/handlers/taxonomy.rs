use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{Category, CategoryInput, CategoryWithCount, Tag, TagInput, TagWithCount},
};

use super::require_text;

// --- Categories ---

/// list_categories
///
/// [Admin Route] Categories with post counts, by name.
#[utoipa::path(
    get,
    path = "/admin/categories",
    responses((status = 200, description = "Categories", body = [CategoryWithCount]))
)]
pub async fn list_categories(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithCount>>, AppError> {
    user.require_admin()?;
    Ok(Json(state.repo.list_categories().await?))
}

#[utoipa::path(
    get,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, AppError> {
    user.require_admin()?;
    state
        .repo
        .get_category(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Category"))
}

/// create_category
///
/// [Admin Route] The slug defaults to the lowercased name with dashes for spaces.
#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 409, description = "Name or slug already taken")
    )
)]
pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    user.require_admin()?;
    require_text("name", &input.name)?;
    let category = state.repo.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not found"),
        (status = 409, description = "Name or slug already taken")
    )
)]
pub async fn update_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>, AppError> {
    user.require_admin()?;
    require_text("name", &input.name)?;
    state
        .repo
        .update_category(id, input)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Category"))
}

/// delete_category
///
/// [Admin Route] Posts keep existing; only their link to the category goes.
#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require_admin()?;
    if state.repo.delete_category(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Category"))
    }
}

// --- Tags ---

#[utoipa::path(
    get,
    path = "/admin/tags",
    responses((status = 200, description = "Tags", body = [TagWithCount]))
)]
pub async fn list_tags(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TagWithCount>>, AppError> {
    user.require_admin()?;
    Ok(Json(state.repo.list_tags().await?))
}

#[utoipa::path(
    get,
    path = "/admin/tags/{id}",
    params(("id" = Uuid, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Tag", body = Tag),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_tag(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tag>, AppError> {
    user.require_admin()?;
    state
        .repo
        .get_tag(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Tag"))
}

#[utoipa::path(
    post,
    path = "/admin/tags",
    request_body = TagInput,
    responses(
        (status = 201, description = "Created", body = Tag),
        (status = 409, description = "Name or slug already taken")
    )
)]
pub async fn create_tag(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<TagInput>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
    user.require_admin()?;
    require_text("name", &input.name)?;
    let tag = state.repo.create_tag(input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

#[utoipa::path(
    put,
    path = "/admin/tags/{id}",
    params(("id" = Uuid, Path, description = "Tag ID")),
    request_body = TagInput,
    responses(
        (status = 200, description = "Updated", body = Tag),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_tag(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<TagInput>,
) -> Result<Json<Tag>, AppError> {
    user.require_admin()?;
    require_text("name", &input.name)?;
    state
        .repo
        .update_tag(id, input)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Tag"))
}

#[utoipa::path(
    delete,
    path = "/admin/tags/{id}",
    params(("id" = Uuid, Path, description = "Tag ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_tag(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require_admin()?;
    if state.repo.delete_tag(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Tag"))
    }
}
