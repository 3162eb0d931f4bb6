//! HTTP handlers: tasks, profile, health.

pub mod http;
pub mod tasks;
pub mod users;

pub use http::{health, AppState, UploadSettings};
