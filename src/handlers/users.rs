//! Profile handlers: view, rename, avatar upload.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::http::AppState;
use crate::middleware::AuthUser;
use crate::models::Profile;

const AVATAR_FIELD: &str = "avatar";
const AVATAR_URL_PREFIX: &str = "/uploads/avatars";

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: &'static str,
    pub user: Profile,
}

/// GET /api/users/me
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Profile>> {
    let user = state
        .store()
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user.into()))
}

/// PUT /api/users/me
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let name = body.name.trim();
    if name.is_empty() || body.validate().is_err() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    let user = state.store().update_user_name(user_id, name).await?;
    info!(user_id = %user_id, "profile updated");
    Ok(Json(ProfileResponse {
        message: "Profile updated successfully",
        user: user.into(),
    }))
}

/// Map an upload's content type to the extension it is stored under. Images only.
fn avatar_extension(content_type: Option<&str>) -> Option<&'static str> {
    match content_type? {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// POST /api/users/avatar — multipart form with an `avatar` file field.
pub async fn upload_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> AppResult<Json<ProfileResponse>> {
    let settings = state.uploads();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let ext = avatar_extension(field.content_type())
            .ok_or_else(|| AppError::Validation("Only image files are allowed".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("No file uploaded".to_string()));
        }
        if bytes.len() > settings.max_avatar_bytes {
            return Err(AppError::Validation("File is too large".to_string()));
        }

        let file_name = format!("{}.{}", Uuid::new_v4().simple(), ext);
        let dir = settings.dir.join("avatars");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| anyhow::anyhow!("create {}: {}", dir.display(), e))?;
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| anyhow::anyhow!("write avatar: {}", e))?;

        let avatar_url = format!("{AVATAR_URL_PREFIX}/{file_name}");
        let user = match state.store().update_user_avatar(user_id, &avatar_url).await {
            Ok(user) => user,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %rm, "failed to remove orphaned avatar");
                }
                return Err(e.into());
            }
        };
        info!(user_id = %user_id, avatar = %avatar_url, "avatar uploaded");
        return Ok(Json(ProfileResponse {
            message: "Avatar uploaded successfully",
            user: user.into(),
        }));
    }

    Err(AppError::Validation("No file uploaded".to_string()))
}
