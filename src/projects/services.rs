use tracing::{info, warn};
use uuid::Uuid;

use super::{dto::ProjectView, repo_types::Project};
use crate::{
    auth::{services::normalize_email, AuthUser},
    error::AppError,
    policy,
    store::Store,
    users::services::user_refs,
};

pub(crate) async fn load_project(store: &dyn Store, id: Uuid) -> Result<Project, AppError> {
    store
        .find_project(id)
        .await?
        .ok_or_else(|| AppError::not_found("Project not found"))
}

pub async fn render(store: &dyn Store, project: Project) -> Result<ProjectView, AppError> {
    render_many(store, vec![project])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("render produced no project")))
}

pub async fn render_many(
    store: &dyn Store,
    projects: Vec<Project>,
) -> Result<Vec<ProjectView>, AppError> {
    let ids = projects
        .iter()
        .flat_map(|p| std::iter::once(p.created_by).chain(p.members.iter().copied()))
        .collect();
    let refs = user_refs(store, ids).await?;
    Ok(projects
        .into_iter()
        .map(|p| ProjectView::build(p, &refs))
        .collect())
}

/// Projects the caller created or belongs to.
pub async fn list_my_projects(
    store: &dyn Store,
    caller: &AuthUser,
) -> Result<Vec<Project>, AppError> {
    Ok(store.list_projects_for_user(caller.id).await?)
}

pub async fn create_project(
    store: &dyn Store,
    caller: &AuthUser,
    name: &str,
    description: &str,
) -> Result<Project, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Project name is required"));
    }
    let project = store.insert_project(name, description, caller.id).await?;
    info!(project_id = %project.id, user_id = %caller.id, "project created");
    Ok(project)
}

pub async fn get_project(
    store: &dyn Store,
    caller: &AuthUser,
    project_id: Uuid,
) -> Result<Project, AppError> {
    let project = load_project(store, project_id).await?;
    policy::ensure_project_access(caller, &project)?;
    Ok(project)
}

pub async fn add_member(
    store: &dyn Store,
    caller: &AuthUser,
    project_id: Uuid,
    email: &str,
) -> Result<Project, AppError> {
    let project = load_project(store, project_id).await?;
    policy::ensure_member_management(caller, &project)?;

    let email = normalize_email(email)?;
    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if project.is_member(user.id) {
        warn!(%project_id, user_id = %user.id, "user already a member");
        return Err(AppError::bad_request("User is already a member"));
    }

    store.add_project_member(project_id, user.id).await?;
    info!(%project_id, user_id = %user.id, added_by = %caller.id, "member added");
    load_project(store, project_id).await
}

/// The creator can never be removed, not even by an admin.
pub async fn remove_member(
    store: &dyn Store,
    caller: &AuthUser,
    project_id: Uuid,
    member_id: Uuid,
) -> Result<Project, AppError> {
    let project = load_project(store, project_id).await?;
    policy::ensure_member_management(caller, &project)?;

    if member_id == project.created_by {
        warn!(%project_id, "attempt to remove project creator");
        return Err(AppError::bad_request("Cannot remove the project creator"));
    }

    store.remove_project_member(project_id, member_id).await?;
    info!(%project_id, %member_id, removed_by = %caller.id, "member removed");
    load_project(store, project_id).await
}
