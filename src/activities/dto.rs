use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::Activity;

#[derive(Debug, Deserialize)]
pub struct RecordActivityRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    /// Display name; defaults to the caller's username.
    pub user: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
}

fn default_status() -> String {
    "success".into()
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub user: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl From<Activity> for ActivityView {
    fn from(a: Activity) -> Self {
        Self {
            id: a.id,
            kind: a.kind,
            title: a.title,
            user: a.user_name,
            status: a.status,
            timestamp: a.timestamp,
        }
    }
}

/// Dashboard cards for the caller's projects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_projects: usize,
    pub team_members: usize,
    pub total_work_items: usize,
    /// Keyed by status label, every status present even when zero.
    pub work_items_by_status: BTreeMap<String, usize>,
}
