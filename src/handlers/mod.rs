//! HTTP handlers, grouped by the area of the site they serve.
//!
//! Handlers return `Result<_, AppError>`; admin handlers re-check the caller's
//! role with `AuthUser::require_admin` even though the request gate already
//! keeps non-admins out of `/admin`.

use crate::error::AppError;

pub mod blog;
pub mod comments;
pub mod dashboard;
pub mod media;
pub mod posts;
pub mod profile;
pub mod session;
pub mod settings;
pub mod taxonomy;
pub mod users;

/// Rejects blank form fields with a 400 naming the field.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}

pub(crate) fn require_email(value: &str) -> Result<(), AppError> {
    require_text("email", value)?;
    let trimmed = value.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::BadRequest("Please enter a valid email address.".to_string())),
    }
}
