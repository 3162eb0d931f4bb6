//! Typed outcomes of the credential and token services.

use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("an account with this email already exists")]
    DuplicateIdentity,

    /// Unknown email and wrong password are deliberately the same variant.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    ExpiredToken,

    #[error("token carries no usable identity")]
    MalformedToken,

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    /// True for failures of token verification (as opposed to credentials or storage).
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken | AuthError::ExpiredToken | AuthError::MalformedToken
        )
    }
}
