//! Authentication: credentials, access/refresh JWTs, and the auth endpoints.

mod error;
mod handlers;
mod jwt;
mod service;

pub use error::AuthError;
pub use handlers::{login, refresh, register};
pub use jwt::{Claims, TokenPair, TokenService, ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};
pub use service::{CredentialService, HashCost, PasswordHashing};
