use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, PasswordSetupResponse, SignupRequest, SignupResponse,
            TokenResponse,
        },
        jwt::{AuthUser, JwtKeys},
        services::{self, LoginOutcome},
    },
    error::AppError,
    extract::Json,
    state::AppState,
    users::dto::PublicUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let user = services::signup(
        state.store.as_ref(),
        &payload.username,
        &payload.email,
        &payload.password,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created".into(),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let outcome =
        services::login(state.store.as_ref(), &keys, &payload.email, &payload.password).await?;

    Ok(Json(match outcome {
        LoginOutcome::Authenticated { token, user } => LoginResponse::Token(TokenResponse {
            token,
            user: user.into(),
        }),
        LoginOutcome::PasswordSetupRequired { email } => {
            LoginResponse::PasswordSetup(PasswordSetupResponse {
                password_setup_required: true,
                email,
            })
        }
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .store
        .find_user_by_id(caller.id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;
    Ok(Json(user.into()))
}
