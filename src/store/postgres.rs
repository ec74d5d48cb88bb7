use std::collections::HashMap;

use anyhow::Context;
use axum::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use super::Store;
use crate::{
    activities::repo_types::{Activity, NewActivity},
    config::AppConfig,
    projects::repo_types::Project,
    users::repo_types::{NewUser, User, UserChanges},
    work_items::repo_types::{Comment, NewWorkItem, WorkItem, WorkItemChanges, WorkItemRow},
};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";

const PROJECT_SELECT: &str = r#"
    SELECT p.id, p.name, p.description, p.created_by, p.created_at,
           ARRAY(
               SELECT m.user_id FROM project_members m
                WHERE m.project_id = p.id
                ORDER BY m.seq
           ) AS members
      FROM projects p
"#;

const WORK_ITEM_COLUMNS: &str =
    "id, project_id, title, description, status, assigned_to, created_by, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }

    async fn comments_for(&self, item_ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, Vec<Comment>>> {
        let rows = sqlx::query_as::<_, Comment>(
            r#"
            SELECT work_item_id, text, author, created_at
              FROM work_item_comments
             WHERE work_item_id = ANY($1)
             ORDER BY seq ASC
            "#,
        )
        .bind(item_ids.to_vec())
        .fetch_all(&self.db)
        .await
        .context("load comments")?;

        let mut grouped: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for c in rows {
            grouped.entry(c.work_item_id).or_default().push(c);
        }
        Ok(grouped)
    }

    async fn with_comments(&self, row: WorkItemRow) -> anyhow::Result<WorkItem> {
        let mut grouped = self.comments_for(&[row.id]).await?;
        let comments = grouped.remove(&row.id).unwrap_or_default();
        Ok(WorkItem::from_row(row, comments))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn count_users(&self) -> anyhow::Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await
            .context("count users")?;
        Ok(n)
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    async fn find_users_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.db)
        .await
        .context("find users by ids")?;
        Ok(users)
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(users)
    }

    async fn insert_user(&self, user: NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET username = COALESCE($2, username),
                   email    = COALESCE($3, email),
                   role     = COALESCE($4, role)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.role)
        .fetch_optional(&self.db)
        .await
        .context("update user")?;
        Ok(user)
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(&self.db)
            .await
            .context("set password hash")?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }

    async fn insert_project(
        &self,
        name: &str,
        description: &str,
        created_by: Uuid,
    ) -> anyhow::Result<Project> {
        let id = Uuid::new_v4();
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query(
            r#"
            INSERT INTO projects (id, name, description, created_by)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(created_by)
        .execute(&mut *tx)
        .await
        .context("insert project")?;
        sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
            .bind(id)
            .bind(created_by)
            .execute(&mut *tx)
            .await
            .context("insert creator membership")?;
        tx.commit().await.context("commit tx")?;

        self.find_project(id)
            .await?
            .context("project vanished after insert")
    }

    async fn find_project(&self, id: Uuid) -> anyhow::Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(&format!("{PROJECT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find project")?;
        Ok(project)
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            r#"
            {PROJECT_SELECT}
             WHERE p.created_by = $1
                OR EXISTS (
                       SELECT 1 FROM project_members m
                        WHERE m.project_id = p.id AND m.user_id = $1
                   )
             ORDER BY p.created_at ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list projects for user")?;
        Ok(projects)
    }

    async fn add_project_member(&self, project_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .execute(&self.db)
        .await
        .context("add project member")?;
        Ok(())
    }

    async fn remove_project_member(&self, project_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("remove project member")?;
        Ok(())
    }

    async fn insert_work_item(&self, item: NewWorkItem) -> anyhow::Result<WorkItem> {
        let row = sqlx::query_as::<_, WorkItemRow>(&format!(
            r#"
            INSERT INTO work_items (id, project_id, title, description, assigned_to, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {WORK_ITEM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(item.project_id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.assigned_to)
        .bind(item.created_by)
        .fetch_one(&self.db)
        .await
        .context("insert work item")?;
        Ok(WorkItem::from_row(row, Vec::new()))
    }

    async fn find_work_item(&self, id: Uuid) -> anyhow::Result<Option<WorkItem>> {
        let row = sqlx::query_as::<_, WorkItemRow>(&format!(
            "SELECT {WORK_ITEM_COLUMNS} FROM work_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find work item")?;
        match row {
            Some(row) => Ok(Some(self.with_comments(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_work_items(&self, project_id: Uuid) -> anyhow::Result<Vec<WorkItem>> {
        let rows = sqlx::query_as::<_, WorkItemRow>(&format!(
            r#"
            SELECT {WORK_ITEM_COLUMNS}
              FROM work_items
             WHERE project_id = $1
             ORDER BY created_at ASC
            "#
        ))
        .bind(project_id)
        .fetch_all(&self.db)
        .await
        .context("list work items")?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut comments = self.comments_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let c = comments.remove(&row.id).unwrap_or_default();
                WorkItem::from_row(row, c)
            })
            .collect())
    }

    async fn update_work_item(
        &self,
        id: Uuid,
        changes: WorkItemChanges,
    ) -> anyhow::Result<Option<WorkItem>> {
        let (touch_assignee, assignee) = match changes.assigned_to {
            Some(a) => (true, a),
            None => (false, None),
        };
        let row = sqlx::query_as::<_, WorkItemRow>(&format!(
            r#"
            UPDATE work_items
               SET title       = COALESCE($2, title),
                   description = COALESCE($3, description),
                   status      = COALESCE($4, status),
                   assigned_to = CASE WHEN $5 THEN $6 ELSE assigned_to END,
                   updated_at  = now()
             WHERE id = $1
            RETURNING {WORK_ITEM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.status)
        .bind(touch_assignee)
        .bind(assignee)
        .fetch_optional(&self.db)
        .await
        .context("update work item")?;
        match row {
            Some(row) => Ok(Some(self.with_comments(row).await?)),
            None => Ok(None),
        }
    }

    async fn push_comment(
        &self,
        work_item_id: Uuid,
        text: &str,
        author: Uuid,
    ) -> anyhow::Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO work_item_comments (work_item_id, text, author)
            SELECT $1, $2, $3
             WHERE EXISTS (SELECT 1 FROM work_items WHERE id = $1)
            RETURNING work_item_id, text, author, created_at
            "#,
        )
        .bind(work_item_id)
        .bind(text)
        .bind(author)
        .fetch_optional(&self.db)
        .await
        .context("push comment")?;
        Ok(comment)
    }

    async fn insert_activity(&self, activity: NewActivity) -> anyhow::Result<Activity> {
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (id, kind, title, user_name, status, timestamp)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, now()))
            RETURNING id, kind, title, user_name, status, timestamp
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&activity.kind)
        .bind(&activity.title)
        .bind(&activity.user_name)
        .bind(&activity.status)
        .bind(activity.timestamp)
        .fetch_one(&self.db)
        .await
        .context("insert activity")?;
        Ok(activity)
    }

    async fn list_activities(&self) -> anyhow::Result<Vec<Activity>> {
        let rows = sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, kind, title, user_name, status, timestamp
              FROM activities
             ORDER BY timestamp DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list activities")?;
        Ok(rows)
    }
}
