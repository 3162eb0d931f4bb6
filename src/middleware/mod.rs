//! Middleware: bearer-token authentication for the protected API.

pub mod auth;

pub use auth::{authenticate, require_auth, AuthUser, IdentityContext};
