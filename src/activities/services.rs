use std::collections::{BTreeMap, HashSet};

use tracing::{info, warn};

use super::{
    dto::{DashboardMetrics, RecordActivityRequest},
    repo_types::{Activity, NewActivity},
};
use crate::{
    auth::AuthUser, error::AppError, store::Store, work_items::repo_types::WorkItemStatus,
};

pub async fn record(
    store: &dyn Store,
    caller: &AuthUser,
    req: RecordActivityRequest,
) -> Result<Activity, AppError> {
    if req.kind.trim().is_empty() || req.title.trim().is_empty() {
        return Err(AppError::bad_request("Activity type and title are required"));
    }
    let activity = store
        .insert_activity(NewActivity {
            kind: req.kind,
            title: req.title,
            user_name: req.user.unwrap_or_else(|| caller.username.clone()),
            status: req.status,
            timestamp: req.timestamp,
        })
        .await?;
    info!(activity_id = %activity.id, kind = %activity.kind, "activity recorded");
    Ok(activity)
}

/// Side-channel feed entry written by other services. Failures are logged
/// and swallowed; the triggering request still succeeds.
pub(crate) async fn record_quietly(store: &dyn Store, caller: &AuthUser, kind: &str, title: &str) {
    let res = store
        .insert_activity(NewActivity {
            kind: kind.to_string(),
            title: title.to_string(),
            user_name: caller.username.clone(),
            status: "success".to_string(),
            timestamp: None,
        })
        .await;
    if let Err(e) = res {
        warn!(error = %e, kind, "failed to record activity");
    }
}

/// Most recent first.
pub async fn list(store: &dyn Store) -> Result<Vec<Activity>, AppError> {
    Ok(store.list_activities().await?)
}

pub async fn metrics(store: &dyn Store, caller: &AuthUser) -> Result<DashboardMetrics, AppError> {
    let projects = store.list_projects_for_user(caller.id).await?;

    let mut members = HashSet::new();
    let mut by_status: BTreeMap<String, usize> = WorkItemStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    let mut total_work_items = 0;

    for p in &projects {
        members.insert(p.created_by);
        members.extend(p.members.iter().copied());
        for item in store.list_work_items(p.id).await? {
            *by_status.entry(item.status.as_str().to_string()).or_default() += 1;
            total_work_items += 1;
        }
    }

    Ok(DashboardMetrics {
        total_projects: projects.len(),
        team_members: members.len(),
        total_work_items,
        work_items_by_status: by_status,
    })
}
