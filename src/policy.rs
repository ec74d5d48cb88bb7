//! Authorization rules. Every handler goes through these functions; none
//! inspects roles or member lists on its own.

use crate::{
    auth::AuthUser, error::AppError, projects::repo_types::Project, users::repo_types::Role,
};

/// Denies unless the caller's role is one of `required`.
pub fn authorize(required: &[Role], caller: &AuthUser) -> Result<(), AppError> {
    if required.contains(&caller.role) {
        Ok(())
    } else {
        Err(AppError::forbidden("Forbidden"))
    }
}

/// Admin, creator or member.
pub fn can_access_project(caller: &AuthUser, project: &Project) -> bool {
    caller.role == Role::Admin || caller.id == project.created_by || project.is_member(caller.id)
}

/// Admin or creator; plain members are excluded.
pub fn can_manage_members(caller: &AuthUser, project: &Project) -> bool {
    caller.role == Role::Admin || caller.id == project.created_by
}

pub fn ensure_project_access(caller: &AuthUser, project: &Project) -> Result<(), AppError> {
    if can_access_project(caller, project) {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "Forbidden: You are not a member of this project.",
        ))
    }
}

pub fn ensure_member_management(caller: &AuthUser, project: &Project) -> Result<(), AppError> {
    if can_manage_members(caller, project) {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "Forbidden: Only the project creator or an admin can manage members.",
        ))
    }
}
