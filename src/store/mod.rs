//! Persistence seam. Services only talk to [`Store`]; production wires in
//! [`PgStore`], tests wire in [`MemoryStore`].
//!
//! Multi-step service operations (load, check, write) are not wrapped in a
//! transaction; concurrent writers resolve last-write-wins.

use axum::async_trait;
use uuid::Uuid;

use crate::{
    activities::repo_types::{Activity, NewActivity},
    projects::repo_types::Project,
    users::repo_types::{NewUser, User, UserChanges},
    work_items::repo_types::{Comment, NewWorkItem, WorkItem, WorkItemChanges},
};

#[cfg(test)]
mod memory;
mod postgres;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn count_users(&self) -> anyhow::Result<i64>;
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    /// Returns the users that exist among `ids`, in no particular order.
    async fn find_users_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>>;
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;
    async fn insert_user(&self, user: NewUser) -> anyhow::Result<User>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> anyhow::Result<Option<User>>;
    async fn set_password_hash(&self, id: Uuid, hash: &str) -> anyhow::Result<()>;
    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool>;

    // projects
    async fn insert_project(
        &self,
        name: &str,
        description: &str,
        created_by: Uuid,
    ) -> anyhow::Result<Project>;
    async fn find_project(&self, id: Uuid) -> anyhow::Result<Option<Project>>;
    /// Projects the user created or is a member of, oldest first.
    async fn list_projects_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Project>>;
    async fn add_project_member(&self, project_id: Uuid, user_id: Uuid) -> anyhow::Result<()>;
    /// Removing an absent member is a no-op.
    async fn remove_project_member(&self, project_id: Uuid, user_id: Uuid) -> anyhow::Result<()>;

    // work items
    async fn insert_work_item(&self, item: NewWorkItem) -> anyhow::Result<WorkItem>;
    async fn find_work_item(&self, id: Uuid) -> anyhow::Result<Option<WorkItem>>;
    /// Items of one project, oldest first, comments in insertion order.
    async fn list_work_items(&self, project_id: Uuid) -> anyhow::Result<Vec<WorkItem>>;
    async fn update_work_item(
        &self,
        id: Uuid,
        changes: WorkItemChanges,
    ) -> anyhow::Result<Option<WorkItem>>;
    /// Appends to the end of the comment list; `None` if the item is gone.
    async fn push_comment(
        &self,
        work_item_id: Uuid,
        text: &str,
        author: Uuid,
    ) -> anyhow::Result<Option<Comment>>;

    // activities
    async fn insert_activity(&self, activity: NewActivity) -> anyhow::Result<Activity>;
    /// Most recent first.
    async fn list_activities(&self) -> anyhow::Result<Vec<Activity>>;
}
