use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{AvatarRequest, Profile, ProfileUpdate, UpdateMyProfileRequest},
};

use super::require_text;

/// get_me
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current profile", body = Profile),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Profile>, AppError> {
    state
        .repo
        .get_profile(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Profile"))
}

/// update_me
///
/// [Authenticated Route] Edits the caller's display name and bio.
#[utoipa::path(
    put,
    path = "/me",
    request_body = UpdateMyProfileRequest,
    responses((status = 200, description = "Updated profile", body = Profile))
)]
pub async fn update_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateMyProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    require_text("full_name", &payload.full_name)?;
    let update = ProfileUpdate {
        full_name: Some(payload.full_name.trim().to_string()),
        professional_bio: payload.professional_bio,
        ..ProfileUpdate::default()
    };
    state
        .repo
        .update_profile(id, update)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Profile"))
}

/// set_avatar
///
/// [Authenticated Route] Points the caller's avatar at an uploaded image
/// (see `POST /upload/presigned` with `folder = "avatars"`).
#[utoipa::path(
    put,
    path = "/me/avatar",
    request_body = AvatarRequest,
    responses((status = 200, description = "Updated profile", body = Profile))
)]
pub async fn set_avatar(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<AvatarRequest>,
) -> Result<Json<Profile>, AppError> {
    require_text("avatar_url", &payload.avatar_url)?;
    let update = ProfileUpdate {
        avatar_url: Some(payload.avatar_url.trim().to_string()),
        ..ProfileUpdate::default()
    };
    state
        .repo
        .update_profile(id, update)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Profile"))
}
