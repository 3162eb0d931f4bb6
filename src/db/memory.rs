//! In-process `Store` used by tests and by `DATABASE_URL=memory` runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    NewTask, NewUser, PublicUser, Task, TaskChanges, TaskPriority, TaskStatus, UserRow,
    UserSummary,
};

#[derive(Debug, Clone)]
struct StoredTask {
    id: Uuid,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: Option<TaskPriority>,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_id: Uuid,
    assigned_to_id: Option<Uuid>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRow>,
    tasks: HashMap<Uuid, StoredTask>,
}

impl Tables {
    fn summary(&self, id: Uuid) -> Option<UserSummary> {
        self.users.get(&id).map(|u| UserSummary {
            id: u.id,
            name: u.name.clone(),
            avatar_url: u.avatar_url.clone(),
        })
    }

    fn task_view(&self, t: &StoredTask) -> StoreResult<Task> {
        let author = self.summary(t.author_id).ok_or(StoreError::ForeignKeyViolation)?;
        Ok(Task {
            id: t.id,
            title: t.title.clone(),
            description: t.description.clone(),
            status: t.status,
            priority: t.priority,
            due_date: t.due_date,
            created_at: t.created_at,
            updated_at: t.updated_at,
            author_id: t.author_id,
            assigned_to_id: t.assigned_to_id,
            author,
            assigned_to: t.assigned_to_id.and_then(|id| self.summary(id)),
        })
    }

    fn check_user_exists(&self, id: Option<Uuid>) -> StoreResult<()> {
        match id {
            Some(id) if !self.users.contains_key(&id) => Err(StoreError::ForeignKeyViolation),
            _ => Ok(()),
        }
    }
}

/// Users and tasks held in a `RwLock`ed map. The uniqueness check and the
/// insert in `create_user` happen under one write guard.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<UserRow> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation);
        }
        let row = UserRow {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            avatar_url: None,
            created_at: Utc::now(),
        };
        tables.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRow>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn update_user_name(&self, id: Uuid, name: &str) -> StoreResult<UserRow> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.name = name.to_string();
        Ok(user.clone())
    }

    async fn update_user_avatar(&self, id: Uuid, avatar_url: &str) -> StoreResult<UserRow> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.avatar_url = Some(avatar_url.to_string());
        Ok(user.clone())
    }

    async fn list_users(&self) -> StoreResult<Vec<PublicUser>> {
        let tables = self.tables.read().await;
        let mut users: Vec<PublicUser> = tables.users.values().map(PublicUser::from).collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        tables.check_user_exists(Some(task.author_id))?;
        tables.check_user_exists(task.assigned_to_id)?;
        let now = Utc::now();
        let stored = StoredTask {
            id: Uuid::new_v4(),
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            created_at: now,
            updated_at: now,
            author_id: task.author_id,
            assigned_to_id: task.assigned_to_id,
        };
        let view = tables.task_view(&stored)?;
        tables.tasks.insert(stored.id, stored);
        Ok(view)
    }

    async fn list_tasks_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        let mut owned: Vec<&StoredTask> = tables
            .tasks
            .values()
            .filter(|t| t.author_id == user_id || t.assigned_to_id == Some(user_id))
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        owned.into_iter().map(|t| tables.task_view(t)).collect()
    }

    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        if !tables.tasks.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if let Some(assignee) = changes.assigned_to_id {
            tables.check_user_exists(assignee)?;
        }
        let task = tables.tasks.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(due_date) = changes.due_date {
            task.due_date = due_date;
        }
        if let Some(assigned_to_id) = changes.assigned_to_id {
            task.assigned_to_id = assigned_to_id;
        }
        task.updated_at = Utc::now();
        let snapshot = task.clone();
        tables.task_view(&snapshot)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "Test".to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@x.com")).await.unwrap();
        let err = store.create_user(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation));
        // Case-sensitive as stored.
        assert!(store.create_user(new_user("A@x.com")).await.is_ok());
    }

    #[tokio::test]
    async fn tasks_are_listed_for_author_and_assignee_newest_first() {
        let store = MemoryStore::new();
        let alice = store.create_user(new_user("alice@x.com")).await.unwrap();
        let bob = store.create_user(new_user("bob@x.com")).await.unwrap();

        let task = |title: &str, assigned_to_id| NewTask {
            title: title.to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: None,
            due_date: None,
            author_id: alice.id,
            assigned_to_id,
        };
        let first = store.create_task(task("first", None)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.create_task(task("second", Some(bob.id))).await.unwrap();

        let alice_tasks = store.list_tasks_for_user(alice.id).await.unwrap();
        assert_eq!(
            alice_tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        let bob_tasks = store.list_tasks_for_user(bob.id).await.unwrap();
        assert_eq!(bob_tasks.len(), 1);
        assert_eq!(bob_tasks[0].assigned_to.as_ref().map(|s| s.id), Some(bob.id));
    }

    #[tokio::test]
    async fn partial_update_and_delete() {
        let store = MemoryStore::new();
        let alice = store.create_user(new_user("alice@x.com")).await.unwrap();
        let created = store
            .create_task(NewTask {
                title: "draft".to_string(),
                description: Some("notes".to_string()),
                status: TaskStatus::Todo,
                priority: Some(TaskPriority::High),
                due_date: None,
                author_id: alice.id,
                assigned_to_id: None,
            })
            .await
            .unwrap();

        let updated = store
            .update_task(
                created.id,
                TaskChanges {
                    status: Some(TaskStatus::Done),
                    description: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.title, "draft");
        assert_eq!(updated.description, None);
        assert_eq!(updated.priority, Some(TaskPriority::High));

        let bad_assignee = store
            .update_task(
                created.id,
                TaskChanges {
                    assigned_to_id: Some(Some(Uuid::new_v4())),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(bad_assignee, Err(StoreError::ForeignKeyViolation)));

        // Unknown task wins over unknown assignee, as in Postgres.
        let missing = store
            .update_task(
                Uuid::new_v4(),
                TaskChanges {
                    assigned_to_id: Some(Some(Uuid::new_v4())),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound)));

        store.delete_task(created.id).await.unwrap();
        assert!(matches!(
            store.delete_task(created.id).await,
            Err(StoreError::NotFound)
        ));
    }
}
