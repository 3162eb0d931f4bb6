//! Task board handlers. Any authenticated user may read or write any task.

use std::fmt;
use std::str::FromStr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::http::AppState;
use crate::middleware::AuthUser;
use crate::models::{NewTask, PublicUser, Task, TaskChanges, TaskPriority, TaskStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub assigned_to_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub priority: Option<Option<TaskPriority>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub assigned_to_id: Option<Option<Uuid>>,
}

impl UpdateTaskRequest {
    fn into_changes(self) -> AppResult<TaskChanges> {
        let title = match self.title {
            Some(t) => Some(non_empty_title(&t)?),
            None => None,
        };
        Ok(TaskChanges {
            title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
            assigned_to_id: self.assigned_to_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub message: &'static str,
    pub task: Task,
}

/// Present-and-null (or blank string) becomes `Some(None)`; absent stays `None` via `#[serde(default)]`.
fn blank_as_null<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(Some(None)),
        Some(s) => s.parse().map(|v| Some(Some(v))).map_err(de::Error::custom),
    }
}

/// Like `blank_as_null` for values that are not plain strings.
fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

fn non_empty_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    Ok(title.to_string())
}

/// GET /api/tasks — tasks the caller authored or is assigned to.
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<Task>>> {
    Ok(Json(state.store().list_tasks_for_user(user_id).await?))
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateTaskRequest>,
) -> AppResult<(StatusCode, Json<TaskResponse>)> {
    let task = state
        .store()
        .create_task(NewTask {
            title: non_empty_title(&body.title)?,
            description: body.description.flatten(),
            status: body.status.unwrap_or_default(),
            priority: body.priority,
            due_date: body.due_date.flatten(),
            author_id: user_id,
            assigned_to_id: body.assigned_to_id.flatten(),
        })
        .await?;
    info!(task_id = %task.id, user_id = %user_id, "task created");
    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            message: "Task created successfully",
            task,
        }),
    ))
}

/// PUT /api/tasks/:id — partial update; also how cards move between columns.
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTaskRequest>,
) -> AppResult<Json<TaskResponse>> {
    let task = state.store().update_task(id, body.into_changes()?).await?;
    info!(task_id = %id, user_id = %user_id, status = ?task.status, "task updated");
    Ok(Json(TaskResponse {
        message: "Task updated successfully",
        task,
    }))
}

/// DELETE /api/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    state.store().delete_task(id).await?;
    info!(task_id = %id, user_id = %user_id, "task deleted");
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

/// GET /api/tasks/users — candidates for assignment.
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> AppResult<Json<Vec<PublicUser>>> {
    Ok(Json(state.store().list_users().await?))
}
