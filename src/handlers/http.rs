//! Shared handler state and the health probe.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{http::StatusCode, Json};
use serde_json::json;

use crate::auth::{CredentialService, TokenService};
use crate::db::Store;

/// Where avatars are written and how large they may be.
#[derive(Clone, Debug)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_avatar_bytes: usize,
}

/// Shared application state. Everything in it is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub credentials: CredentialService,
    pub tokens: TokenService,
    pub uploads: UploadSettings,
}

impl AppState {
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
    pub fn credentials(&self) -> &CredentialService {
        &self.credentials
    }
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
    pub fn uploads(&self) -> &UploadSettings {
        &self.uploads
    }
}

/// GET /health — liveness probe.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "taskboard" })),
    )
}
