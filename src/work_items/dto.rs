use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Comment, WorkItem, WorkItemStatus};
use crate::users::dto::UserRef;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkItemRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
}

/// Partial update body. Missing keys leave fields untouched; `assignedTo: null`
/// clears the assignment.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<WorkItemStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
}

/// Keeps an explicit `null` distinct from a missing key: missing -> `None`
/// (via `#[serde(default)]`), `null` -> `Some(None)`, value -> `Some(Some(v))`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub text: String,
    pub author: Option<UserRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: WorkItemStatus,
    pub project_id: Uuid,
    pub assigned_to: Option<UserRef>,
    pub created_by: Option<UserRef>,
    pub comments: Vec<CommentView>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl WorkItemView {
    pub fn build(w: WorkItem, refs: &HashMap<Uuid, UserRef>) -> Self {
        let lookup = |id: &Uuid| refs.get(id).cloned();
        Self {
            id: w.id,
            title: w.title,
            description: w.description,
            status: w.status,
            project_id: w.project_id,
            assigned_to: w.assigned_to.as_ref().and_then(lookup),
            created_by: lookup(&w.created_by),
            comments: w
                .comments
                .into_iter()
                .map(|c: Comment| CommentView {
                    author: lookup(&c.author),
                    text: c.text,
                    created_at: c.created_at,
                })
                .collect(),
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}
