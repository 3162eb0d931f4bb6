//! Application error type and its mapping to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::AuthError;
use crate::db::StoreError;

const GENERIC_FAILURE: &str = "Something went wrong";
const UNAUTHORIZED: &str = "Unauthorized";

/// Application-level errors. This is the only place a failure becomes a status code.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("unauthorized")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Status code and client-facing message. Internal detail never reaches the message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Auth(AuthError::DuplicateIdentity) => {
                (StatusCode::BAD_REQUEST, "User already exists".to_string())
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                (StatusCode::BAD_REQUEST, "Invalid credentials".to_string())
            }
            AppError::Auth(e) if e.is_token_error() => {
                (StatusCode::UNAUTHORIZED, UNAUTHORIZED.to_string())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, UNAUTHORIZED.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Store(StoreError::NotFound) => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            AppError::Store(StoreError::ForeignKeyViolation) => (
                StatusCode::BAD_REQUEST,
                "Referenced user does not exist".to_string(),
            ),
            AppError::Store(StoreError::UniqueViolation) => {
                (StatusCode::CONFLICT, "Already exists".to_string())
            }
            AppError::Auth(_) | AppError::Store(StoreError::Sqlx(_)) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        let body = Json(json!({ "message": message }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Body for responses produced outside a handler (panics caught by the router).
pub fn generic_failure_body() -> serde_json::Value {
    json!({ "message": GENERIC_FAILURE })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: AppError) -> StatusCode {
        e.into_response().status()
    }

    #[test]
    fn credential_errors_are_bad_requests() {
        assert_eq!(
            status_of(AuthError::DuplicateIdentity.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AuthError::InvalidCredentials.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn token_errors_share_one_message() {
        let messages: Vec<String> = [
            AuthError::InvalidToken,
            AuthError::ExpiredToken,
            AuthError::MalformedToken,
        ]
        .into_iter()
        .map(|e| {
            let (status, msg) = AppError::from(e).status_and_message();
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            msg
        })
        .collect();
        assert!(messages.iter().all(|m| m == UNAUTHORIZED));
        assert_eq!(
            AppError::Unauthorized.status_and_message().1,
            UNAUTHORIZED.to_string()
        );
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused to 10.0.0.3"));
        let (status, msg) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, GENERIC_FAILURE);

        let err = AppError::Auth(AuthError::Hashing("bad params".to_string()));
        assert_eq!(err.status_and_message().1, GENERIC_FAILURE);
    }

    #[test]
    fn store_not_found_is_404() {
        assert_eq!(
            status_of(StoreError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
    }
}
