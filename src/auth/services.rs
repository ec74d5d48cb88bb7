use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{jwt::JwtKeys, password};
use crate::{
    error::AppError,
    store::Store,
    users::repo_types::{NewUser, Role, User},
};

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lowercases, then rejects anything that is not `x@y.z`.
pub(crate) fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }
    Ok(email)
}

pub(crate) fn normalize_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AppError::bad_request("Username is required"));
    }
    Ok(username.to_string())
}

pub(crate) fn check_password(plain: &str) -> Result<(), AppError> {
    if plain.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::bad_request("Password too short"));
    }
    Ok(())
}

/// Fails with Conflict when either the username or the email is already used.
pub(crate) async fn ensure_unique(
    store: &dyn Store,
    username: &str,
    email: &str,
) -> Result<(), AppError> {
    if store.find_user_by_email(email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::conflict("Email already registered"));
    }
    if store.find_user_by_username(username).await?.is_some() {
        warn!(username = %username, "username already taken");
        return Err(AppError::conflict("Username already taken"));
    }
    Ok(())
}

/// Creates an active account. The very first account becomes admin.
pub async fn signup(
    store: &dyn Store,
    username: &str,
    email: &str,
    plain_password: &str,
) -> Result<User, AppError> {
    let username = normalize_username(username)?;
    let email = normalize_email(email)?;
    check_password(plain_password)?;
    ensure_unique(store, &username, &email).await?;

    let role = if store.count_users().await? == 0 {
        Role::Admin
    } else {
        Role::User
    };
    let hash = password::hash_password(plain_password)?;
    let user = store
        .insert_user(NewUser {
            username,
            email,
            password_hash: Some(hash),
            role,
        })
        .await?;

    info!(user_id = %user.id, role = %user.role, "user signed up");
    Ok(user)
}

#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated { token: String, user: User },
    /// Invited account without a password yet.
    PasswordSetupRequired { email: String },
}

pub async fn login(
    store: &dyn Store,
    keys: &JwtKeys,
    email: &str,
    plain_password: &str,
) -> Result<LoginOutcome, AppError> {
    let email = email.trim().to_lowercase();

    let Some(user) = store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::not_found("User not found"));
    };

    let Some(hash) = user.password_hash.as_deref() else {
        info!(user_id = %user.id, "login requires password setup");
        return Ok(LoginOutcome::PasswordSetupRequired { email: user.email });
    };

    if !password::verify_password(plain_password, hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let token = keys.sign(&user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(LoginOutcome::Authenticated { token, user })
}

/// Activates an invited account. Refuses accounts that already have a
/// password so the endpoint cannot be used to reset one.
pub async fn set_password(
    store: &dyn Store,
    email: &str,
    plain_password: &str,
) -> Result<(), AppError> {
    let email = email.trim().to_lowercase();
    check_password(plain_password)?;

    let Some(user) = store.find_user_by_email(&email).await? else {
        return Err(AppError::not_found("User not found"));
    };
    if user.is_active() {
        warn!(user_id = %user.id, "set-password on active account");
        return Err(AppError::bad_request("Password already set"));
    }

    let hash = password::hash_password(plain_password)?;
    store.set_password_hash(user.id, &hash).await?;
    info!(user_id = %user.id, "account activated");
    Ok(())
}
