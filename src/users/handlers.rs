use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        AddUserRequest, InviteRequest, MessageResponse, PublicUser, SetPasswordRequest,
        UpdateUserRequest,
    },
    services,
};
use crate::{
    auth::{services as auth_services, AuthUser},
    error::AppError,
    extract::{Json, Path},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(add_user))
        .route("/users/invite", post(invite_user))
        .route("/users/set-password", post(set_password))
        .route("/users/:id", put(update_user).delete(remove_user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = services::list_users(state.store.as_ref(), &caller).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn invite_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<InviteRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = services::invite(state.store.as_ref(), &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn add_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<AddUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = services::add_user(state.store.as_ref(), &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::update_user(state.store.as_ref(), &caller, id, payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn remove_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    services::remove_user(state.store.as_ref(), &caller, id).await?;
    Ok(Json(MessageResponse::new("User removed")))
}

/// Public: activates an invited account.
#[instrument(skip(state, payload))]
pub async fn set_password(
    State(state): State<AppState>,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_services::set_password(state.store.as_ref(), &payload.email, &payload.password).await?;
    Ok(Json(MessageResponse::new("Password set successfully")))
}
