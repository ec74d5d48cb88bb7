use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{AddUserRequest, InviteRequest, UpdateUserRequest, UserRef},
    repo_types::{NewUser, Role, User, UserChanges},
};
use crate::{
    auth::{
        password,
        services::{check_password, ensure_unique, normalize_email, normalize_username},
        AuthUser,
    },
    error::AppError,
    policy,
    store::Store,
};

/// Loads `{id, username, email}` for each referenced user. Ids of users that
/// no longer exist are absent from the map.
pub(crate) async fn user_refs(
    store: &dyn Store,
    mut ids: Vec<Uuid>,
) -> anyhow::Result<HashMap<Uuid, UserRef>> {
    ids.sort_unstable();
    ids.dedup();
    let users = store.find_users_by_ids(&ids).await?;
    Ok(users.iter().map(|u| (u.id, UserRef::from(u))).collect())
}

pub async fn list_users(store: &dyn Store, caller: &AuthUser) -> Result<Vec<User>, AppError> {
    policy::authorize(&[Role::Admin], caller)?;
    Ok(store.list_users().await?)
}

/// Creates an inactive account; the invitee activates it via set-password.
/// Without a username the email doubles as one.
pub async fn invite(
    store: &dyn Store,
    caller: &AuthUser,
    req: InviteRequest,
) -> Result<User, AppError> {
    policy::authorize(&[Role::Admin], caller)?;
    let email = normalize_email(&req.email)?;
    let username = match req.username.as_deref() {
        Some(name) => normalize_username(name)?,
        None => email.clone(),
    };
    ensure_unique(store, &username, &email).await?;

    let user = store
        .insert_user(NewUser {
            username,
            email,
            password_hash: None,
            role: Role::User,
        })
        .await?;
    info!(user_id = %user.id, invited_by = %caller.id, "user invited");
    Ok(user)
}

pub async fn add_user(
    store: &dyn Store,
    caller: &AuthUser,
    req: AddUserRequest,
) -> Result<User, AppError> {
    policy::authorize(&[Role::Admin], caller)?;
    let username = normalize_username(&req.username)?;
    let email = normalize_email(&req.email)?;
    check_password(&req.password)?;
    ensure_unique(store, &username, &email).await?;

    let hash = password::hash_password(&req.password)?;
    let user = store
        .insert_user(NewUser {
            username,
            email,
            password_hash: Some(hash),
            role: req.role.unwrap_or(Role::User),
        })
        .await?;
    info!(user_id = %user.id, role = %user.role, added_by = %caller.id, "user added");
    Ok(user)
}

pub async fn update_user(
    store: &dyn Store,
    caller: &AuthUser,
    id: Uuid,
    req: UpdateUserRequest,
) -> Result<User, AppError> {
    policy::authorize(&[Role::Admin], caller)?;

    let mut changes = UserChanges {
        role: req.role,
        ..Default::default()
    };
    if let Some(name) = req.username.as_deref() {
        let name = normalize_username(name)?;
        if let Some(other) = store.find_user_by_username(&name).await? {
            if other.id != id {
                return Err(AppError::conflict("Username already taken"));
            }
        }
        changes.username = Some(name);
    }
    if let Some(email) = req.email.as_deref() {
        let email = normalize_email(email)?;
        if let Some(other) = store.find_user_by_email(&email).await? {
            if other.id != id {
                return Err(AppError::conflict("Email already registered"));
            }
        }
        changes.email = Some(email);
    }

    let user = store
        .update_user(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(user_id = %user.id, updated_by = %caller.id, "user updated");
    Ok(user)
}

pub async fn remove_user(store: &dyn Store, caller: &AuthUser, id: Uuid) -> Result<(), AppError> {
    policy::authorize(&[Role::Admin], caller)?;
    if id == caller.id {
        warn!(user_id = %id, "admin tried to remove own account");
        return Err(AppError::bad_request("Cannot remove your own account"));
    }
    if !store.delete_user(id).await? {
        return Err(AppError::not_found("User not found"));
    }
    info!(user_id = %id, removed_by = %caller.id, "user removed");
    Ok(())
}
