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
    models::{InviteUserRequest, NewProfile, Profile, ProfileUpdate, UpdateUserRequest, UserSummary},
    role::Role,
};

use super::{require_email, require_text};

/// Role strings accepted from the user forms. `Unknown` is never assignable.
fn assignable_role(raw: &str) -> Result<Role, AppError> {
    match Role::parse(raw.trim()) {
        Role::Unknown => Err(AppError::BadRequest(format!("Unknown role '{}'", raw.trim()))),
        role => Ok(role),
    }
}

/// list_users
///
/// [Admin Route] Every profile with its post count, newest first.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "Users", body = [UserSummary]))
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    user.require_admin()?;
    Ok(Json(state.repo.list_users().await?))
}

#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Profile", body = Profile),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    user.require_admin()?;
    state
        .repo
        .get_profile(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("User"))
}

/// invite_user
///
/// [Admin Route] Sends an invitation e-mail through the identity provider and
/// creates the profile with the chosen role. Needs the service-role key.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = InviteUserRequest,
    responses(
        (status = 201, description = "Invited", body = Profile),
        (status = 400, description = "Invalid input or rejected by the identity provider"),
        (status = 500, description = "Service-role key not configured")
    )
)]
pub async fn invite_user(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<InviteUserRequest>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    user.require_admin()?;
    require_text("name", &payload.name)?;
    require_email(&payload.email)?;
    let role = assignable_role(&payload.role)?;

    let email = payload.email.trim();
    let name = payload.name.trim();
    let user_id = state.auth.invite_user(email, name, role.as_str()).await?;

    let profile = state
        .repo
        .upsert_profile(NewProfile {
            id: user_id,
            email: Some(email.to_string()),
            full_name: Some(name.to_string()),
            role,
        })
        .await?;

    tracing::info!(invited_by = %user.id, %user_id, role = %role, "user invited");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// update_user
///
/// [Admin Route] Changes name, e-mail, role and bio of a profile.
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = Profile),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<Profile>, AppError> {
    user.require_admin()?;
    require_text("name", &payload.name)?;
    require_email(&payload.email)?;
    let role = assignable_role(&payload.role)?;

    let update = ProfileUpdate {
        full_name: Some(payload.name.trim().to_string()),
        email: Some(payload.email.trim().to_string()),
        role: Some(role.as_str().to_string()),
        professional_bio: payload.professional_bio,
        avatar_url: None,
    };

    let profile = state
        .repo
        .update_profile(id, update)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    tracing::info!(updated_by = %user.id, user_id = %id, role = %role, "user updated");
    Ok(Json(profile))
}

/// delete_user
///
/// [Admin Route] Removes the account from the identity provider, then the
/// profile. Admins cannot delete themselves.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Tried to delete own account"),
        (status = 404, description = "Not found"),
        (status = 500, description = "Service-role key not configured")
    )
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require_admin()?;
    if id == user.id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }
    if state.repo.get_profile(id).await?.is_none() {
        return Err(AppError::NotFound("User"));
    }

    state.auth.delete_user(id).await?;
    state.repo.delete_profile(id).await?;

    tracing::info!(deleted_by = %user.id, user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
