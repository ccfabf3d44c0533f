use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{SiteSettings, SiteSettingsInput},
};

/// get_settings
///
/// [Admin Route] The settings row, or the defaults if it was never saved.
#[utoipa::path(
    get,
    path = "/admin/settings",
    responses((status = 200, description = "Site settings", body = SiteSettings))
)]
pub async fn get_settings(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SiteSettings>, AppError> {
    user.require_admin()?;
    Ok(Json(state.repo.get_settings().await?.unwrap_or_default()))
}

/// save_settings
///
/// [Admin Route] Replaces the settings row. Turning `maintenance_mode` on takes
/// effect on the next request: the gate reads the flag per request.
#[utoipa::path(
    put,
    path = "/admin/settings",
    request_body = SiteSettingsInput,
    responses((status = 200, description = "Saved", body = SiteSettings))
)]
pub async fn save_settings(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SiteSettingsInput>,
) -> Result<Json<SiteSettings>, AppError> {
    user.require_admin()?;
    let settings = state.repo.save_settings(input).await?;
    tracing::info!(
        updated_by = %user.id,
        maintenance_mode = settings.maintenance_mode,
        "site settings saved"
    );
    Ok(Json(settings))
}
