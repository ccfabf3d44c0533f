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
    models::{MEDIA_FOLDERS, MediaAsset, PresignedUrlRequest, PresignedUrlResponse},
    storage::sanitize_key,
};

const DEFAULT_UPLOAD_FOLDER: &str = "posts";

/// Splits `folder/name` and checks the folder is one of the media folders.
fn media_key(raw: &str) -> Result<(String, &'static str), AppError> {
    let key = sanitize_key(raw);
    let folder = key
        .split_once('/')
        .and_then(|(folder, name)| (!name.is_empty()).then_some(folder))
        .and_then(|folder| MEDIA_FOLDERS.iter().copied().find(|f| *f == folder))
        .ok_or_else(|| AppError::BadRequest(format!("'{}' is not a media object", raw)))?;
    Ok((key, folder))
}

/// list_media
///
/// [Admin Route] Every object in the media folders, newest first.
#[utoipa::path(
    get,
    path = "/admin/media",
    responses((status = 200, description = "Media assets", body = [MediaAsset]))
)]
pub async fn list_media(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<MediaAsset>>, AppError> {
    user.require_admin()?;

    let mut assets = Vec::new();
    for folder in MEDIA_FOLDERS {
        let objects = state
            .storage
            .list_objects(&format!("{}/", folder))
            .await
            .map_err(AppError::Storage)?;

        assets.extend(objects.into_iter().map(|object| MediaAsset {
            name: object
                .key
                .rsplit('/')
                .next()
                .unwrap_or(&object.key)
                .to_string(),
            folder: folder.to_string(),
            url: state.storage.public_url(&object.key),
            size_bytes: object.size_bytes,
            created_at: object.last_modified,
        }));
    }

    assets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(assets))
}

/// delete_media
///
/// [Admin Route] Deletes one object, addressed as `folder/name`.
#[utoipa::path(
    delete,
    path = "/admin/media/{key}",
    params(("key" = String, Path, description = "Object key, e.g. posts/cover.png")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Not a media object")
    )
)]
pub async fn delete_media(
    user: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    user.require_admin()?;
    let (key, _) = media_key(&key)?;

    state
        .storage
        .delete_object(&key)
        .await
        .map_err(AppError::Storage)?;
    tracing::info!(key = %key, deleted_by = %user.id, "media deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// get_presigned_url
///
/// [Authenticated Route] A 10-minute upload URL for a fresh key in one of the
/// media folders. Only the avatar folder is open to non-admins.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 400, description = "Unknown folder"),
        (status = 403, description = "Folder reserved for admins")
    )
)]
pub async fn get_presigned_url(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    let folder = payload
        .folder
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_UPLOAD_FOLDER);
    let folder = MEDIA_FOLDERS
        .iter()
        .copied()
        .find(|f| *f == folder)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown folder '{}'", folder)))?;

    if folder != "avatars" {
        user.require_admin()?;
    }

    let extension = std::path::Path::new(&payload.filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin")
        .to_lowercase();
    let object_key = format!("{}/{}.{}", folder, Uuid::new_v4(), extension);

    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await
        .map_err(AppError::Storage)?;

    Ok(Json(PresignedUrlResponse {
        upload_url,
        public_url: state.storage.public_url(&object_key),
        resource_key: object_key,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_keys_must_live_in_a_media_folder() {
        assert_eq!(media_key("posts/a.png").unwrap(), ("posts/a.png".to_string(), "posts"));
        assert_eq!(media_key("/avatars/../avatars/b.jpg").unwrap().0, "avatars/avatars/b.jpg");
        assert!(media_key("secrets/a.png").is_err());
        assert!(media_key("posts/").is_err());
        assert!(media_key("posts").is_err());
    }
}
