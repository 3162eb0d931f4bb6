//! PostgreSQL-backed `Store`: users and tasks.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::{DbPool, Store, StoreError, StoreResult};
use crate::models::{NewTask, NewUser, PublicUser, Task, TaskChanges, TaskRow, UserRow};

const USER_COLUMNS: &str = "id, email, name, password_hash, avatar_url, created_at";

const TASK_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.status, t.priority, t.due_date,
           t.created_at, t.updated_at, t.author_id, t.assigned_to_id,
           a.name AS author_name, a.avatar_url AS author_avatar_url,
           u.name AS assignee_name, u.avatar_url AS assignee_avatar_url
    FROM tasks t
    JOIN users a ON a.id = t.author_id
    LEFT JOIN users u ON u.id = t.assigned_to_id
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn task_by_id(&self, id: Uuid) -> StoreResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!("{TASK_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        Ok(row.into())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, email, name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        debug!(user_id = %row.id, "user inserted");
        Ok(row)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_user_name(&self, id: Uuid, name: &str) -> StoreResult<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET name = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::NotFound)
    }

    async fn update_user_avatar(&self, id: Uuid, avatar_url: &str) -> StoreResult<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET avatar_url = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(avatar_url)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::NotFound)
    }

    async fn list_users(&self) -> StoreResult<Vec<PublicUser>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PublicUser::from).collect())
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO tasks (id, title, description, status, priority, due_date, author_id, assigned_to_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.due_date)
        .bind(task.author_id)
        .bind(task.assigned_to_id)
        .execute(&self.pool)
        .await?;
        self.task_by_id(id).await
    }

    async fn list_tasks_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "{TASK_SELECT} WHERE t.author_id = $1 OR t.assigned_to_id = $1 ORDER BY t.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> StoreResult<Task> {
        let r = sqlx::query(
            r#"
            UPDATE tasks SET
                title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                status = COALESCE($5, status),
                priority = CASE WHEN $6 THEN $7 ELSE priority END,
                due_date = CASE WHEN $8 THEN $9 ELSE due_date END,
                assigned_to_id = CASE WHEN $10 THEN $11 ELSE assigned_to_id END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(changes.description.is_some())
        .bind(changes.description.clone().flatten())
        .bind(changes.status)
        .bind(changes.priority.is_some())
        .bind(changes.priority.flatten())
        .bind(changes.due_date.is_some())
        .bind(changes.due_date.flatten())
        .bind(changes.assigned_to_id.is_some())
        .bind(changes.assigned_to_id.flatten())
        .execute(&self.pool)
        .await?;
        if r.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.task_by_id(id).await
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        let r = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if r.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
