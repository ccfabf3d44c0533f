use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{Analytics, DashboardStats},
};

/// get_dashboard
///
/// [Admin Route] Post counters (trash excluded), total views and the most
/// recent posts. This is also where admins land after signing in.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses((status = 200, description = "Dashboard", body = DashboardStats))
)]
pub async fn get_dashboard(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    user.require_admin()?;
    Ok(Json(state.repo.dashboard_stats().await?))
}

/// get_analytics
///
/// [Admin Route] Category share, comment total and top posts by views.
#[utoipa::path(
    get,
    path = "/admin/analytics",
    responses((status = 200, description = "Analytics", body = Analytics))
)]
pub async fn get_analytics(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Analytics>, AppError> {
    user.require_admin()?;
    Ok(Json(state.repo.analytics().await?))
}
