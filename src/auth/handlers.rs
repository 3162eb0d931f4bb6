//! Auth HTTP handlers: register, login, refresh.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::TokenPair;
use crate::error::{AppError, AppResult};
use crate::handlers::http::AppState;
use crate::models::PublicUser;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "Password must be 6-128 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub tokens: TokenPair,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: &'static str,
    pub tokens: TokenPair,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(mut body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    body.name = body.name.trim().to_string();
    body.validate()
        .map_err(|e| AppError::Validation(first_message(&e)))?;

    let user = state
        .credentials()
        .register(&body.email, &body.password, &body.name)
        .await?;
    let tokens = state.tokens().issue_pair(user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully",
            tokens,
            user: user.into(),
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = state
        .credentials()
        .authenticate(&body.email, &body.password)
        .await?;
    let tokens = state.tokens().issue_pair(user.id)?;

    Ok(Json(AuthResponse {
        message: "Login successful",
        tokens,
        user: user.into(),
    }))
}

/// POST /api/auth/refresh — trade a valid refresh token for a new pair.
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let user_id = state.tokens().verify_refresh(&body.refresh_token).map_err(|e| {
        tracing::debug!(reason = %e, "refresh token rejected");
        AppError::Unauthorized
    })?;

    // The account may have vanished since the token was issued.
    if state.store().find_user_by_id(user_id).await?.is_none() {
        return Err(AppError::Unauthorized);
    }

    let tokens = state.tokens().issue_pair(user_id)?;
    Ok(Json(RefreshResponse {
        message: "Tokens refreshed",
        tokens,
    }))
}

/// Pick one human-readable message out of validator's field map.
fn first_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}
