use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::Project;
use crate::users::dto::UserRef;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
}

/// Project with creator and members expanded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Option<UserRef>,
    pub members: Vec<UserRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ProjectView {
    /// Builds the view from a lookup of referenced users; members that no
    /// longer exist are dropped.
    pub fn build(p: Project, refs: &HashMap<Uuid, UserRef>) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            created_by: refs.get(&p.created_by).cloned(),
            members: p
                .members
                .iter()
                .filter_map(|m| refs.get(m).cloned())
                .collect(),
            created_at: p.created_at,
        }
    }
}
