use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::{
    activities::repo_types::{Activity, NewActivity},
    projects::repo_types::Project,
    users::repo_types::{NewUser, User, UserChanges},
    work_items::repo_types::{Comment, NewWorkItem, WorkItem, WorkItemChanges, WorkItemStatus},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    projects: Vec<Project>,
    work_items: Vec<WorkItem>,
    activities: Vec<Activity>,
}

/// Process-local store with the same observable behaviour as [`super::PgStore`].
/// Rows are kept in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn count_users(&self) -> anyhow::Result<i64> {
        Ok(self.tables.read().await.users.len() as i64)
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_users_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn insert_user(&self, user: NewUser) -> anyhow::Result<User> {
        let mut t = self.tables.write().await;
        if t.users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            anyhow::bail!("duplicate key value violates unique constraint");
        }
        let row = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(row.clone());
        Ok(row)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.write().await;
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        Ok(Some(user.clone()))
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        if let Some(user) = t.users.iter_mut().find(|u| u.id == id) {
            user.password_hash = Some(hash.to_string());
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        if t.users.len() == before {
            return Ok(false);
        }
        // mirror the foreign key actions of the SQL schema
        for p in t.projects.iter_mut() {
            p.members.retain(|m| *m != id);
        }
        for w in t.work_items.iter_mut() {
            if w.assigned_to == Some(id) {
                w.assigned_to = None;
            }
        }
        Ok(true)
    }

    async fn insert_project(
        &self,
        name: &str,
        description: &str,
        created_by: Uuid,
    ) -> anyhow::Result<Project> {
        let row = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            created_by,
            members: vec![created_by],
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.write().await.projects.push(row.clone());
        Ok(row)
    }

    async fn find_project(&self, id: Uuid) -> anyhow::Result<Option<Project>> {
        let t = self.tables.read().await;
        Ok(t.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Project>> {
        let t = self.tables.read().await;
        Ok(t.projects
            .iter()
            .filter(|p| p.created_by == user_id || p.is_member(user_id))
            .cloned()
            .collect())
    }

    async fn add_project_member(&self, project_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        if let Some(p) = t.projects.iter_mut().find(|p| p.id == project_id) {
            if !p.is_member(user_id) {
                p.members.push(user_id);
            }
        }
        Ok(())
    }

    async fn remove_project_member(&self, project_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        if let Some(p) = t.projects.iter_mut().find(|p| p.id == project_id) {
            p.members.retain(|m| *m != user_id);
        }
        Ok(())
    }

    async fn insert_work_item(&self, item: NewWorkItem) -> anyhow::Result<WorkItem> {
        let now = OffsetDateTime::now_utc();
        let row = WorkItem {
            id: Uuid::new_v4(),
            project_id: item.project_id,
            title: item.title,
            description: item.description,
            status: WorkItemStatus::default(),
            assigned_to: item.assigned_to,
            created_by: item.created_by,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.work_items.push(row.clone());
        Ok(row)
    }

    async fn find_work_item(&self, id: Uuid) -> anyhow::Result<Option<WorkItem>> {
        let t = self.tables.read().await;
        Ok(t.work_items.iter().find(|w| w.id == id).cloned())
    }

    async fn list_work_items(&self, project_id: Uuid) -> anyhow::Result<Vec<WorkItem>> {
        let t = self.tables.read().await;
        Ok(t.work_items
            .iter()
            .filter(|w| w.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn update_work_item(
        &self,
        id: Uuid,
        changes: WorkItemChanges,
    ) -> anyhow::Result<Option<WorkItem>> {
        let mut t = self.tables.write().await;
        let Some(item) = t.work_items.iter_mut().find(|w| w.id == id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            item.title = title;
        }
        if let Some(description) = changes.description {
            item.description = description;
        }
        if let Some(status) = changes.status {
            item.status = status;
        }
        if let Some(assigned_to) = changes.assigned_to {
            item.assigned_to = assigned_to;
        }
        item.updated_at = OffsetDateTime::now_utc();
        Ok(Some(item.clone()))
    }

    async fn push_comment(
        &self,
        work_item_id: Uuid,
        text: &str,
        author: Uuid,
    ) -> anyhow::Result<Option<Comment>> {
        let mut t = self.tables.write().await;
        let Some(item) = t.work_items.iter_mut().find(|w| w.id == work_item_id) else {
            return Ok(None);
        };
        let comment = Comment {
            work_item_id,
            text: text.to_string(),
            author,
            created_at: OffsetDateTime::now_utc(),
        };
        item.comments.push(comment.clone());
        Ok(Some(comment))
    }

    async fn insert_activity(&self, activity: NewActivity) -> anyhow::Result<Activity> {
        let row = Activity {
            id: Uuid::new_v4(),
            kind: activity.kind,
            title: activity.title,
            user_name: activity.user_name,
            status: activity.status,
            timestamp: activity.timestamp.unwrap_or_else(OffsetDateTime::now_utc),
        };
        self.tables.write().await.activities.push(row.clone());
        Ok(row)
    }

    async fn list_activities(&self) -> anyhow::Result<Vec<Activity>> {
        let t = self.tables.read().await;
        // ties: newest insert first
        let mut rows: Vec<Activity> = t.activities.iter().rev().cloned().collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }
}
