use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Board column a work item sits in. Any value may follow any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "work_item_status")]
pub enum WorkItemStatus {
    Backlog,
    #[default]
    #[sqlx(rename = "To Do")]
    #[serde(rename = "To Do")]
    ToDo,
    #[sqlx(rename = "In Progress")]
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
    Cancelled,
}

impl WorkItemStatus {
    pub const ALL: [WorkItemStatus; 5] = [
        WorkItemStatus::Backlog,
        WorkItemStatus::ToDo,
        WorkItemStatus::InProgress,
        WorkItemStatus::Done,
        WorkItemStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemStatus::Backlog => "Backlog",
            WorkItemStatus::ToDo => "To Do",
            WorkItemStatus::InProgress => "In Progress",
            WorkItemStatus::Done => "Done",
            WorkItemStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub work_item_id: Uuid,
    pub text: String,
    pub author: Uuid,
    pub created_at: OffsetDateTime,
}

/// Work item without its comments, as stored in `work_items`.
#[derive(Debug, Clone, FromRow)]
pub struct WorkItemRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: WorkItemStatus,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: WorkItemStatus,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub comments: Vec<Comment>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl WorkItem {
    pub fn from_row(row: WorkItemRow, comments: Vec<Comment>) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            title: row.title,
            description: row.description,
            status: row.status,
            assigned_to: row.assigned_to,
            created_by: row.created_by,
            comments,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewWorkItem {
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
}

/// Partial update. For `assigned_to`: `None` = untouched, `Some(None)` = clear,
/// `Some(Some(id))` = assign.
#[derive(Debug, Clone, Default)]
pub struct WorkItemChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<WorkItemStatus>,
    pub assigned_to: Option<Option<Uuid>>,
}
