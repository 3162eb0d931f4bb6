//! Task board backend built with Rust.
//!
//! Users register and log in with email/password, receive an access/refresh
//! JWT pair, and manage tasks on a shared board through a bearer-protected
//! REST API.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

pub use config::Config;
pub use error::AppError;
pub use handlers::{AppState, UploadSettings};

use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json,
};
use handlers::{http, tasks, users};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(error::generic_failure_body()),
    )
        .into_response()
}

/// Build the API router (auth, users, tasks, health). Used by main and by integration tests.
pub fn create_app(state: AppState) -> axum::Router {
    let auth_routes = axum::Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh));

    let avatar_limit = state.uploads().max_avatar_bytes + MULTIPART_OVERHEAD;
    let user_routes = axum::Router::new()
        .route("/me", get(users::get_profile).put(users::update_profile))
        .route(
            "/avatar",
            post(users::upload_avatar).layer(DefaultBodyLimit::max(avatar_limit)),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let task_routes = axum::Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route("/users", get(tasks::list_users))
        .route("/:id", put(tasks::update_task).delete(tasks::delete_task))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let api = axum::Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/tasks", task_routes);

    axum::Router::new()
        .route("/health", get(http::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}
