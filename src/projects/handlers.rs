use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{AddMemberRequest, CreateProjectRequest, ProjectView},
    services,
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{Json, Path},
    state::AppState,
};

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/:project_id", get(get_project))
        .route("/projects/:project_id/members", post(add_member))
        .route(
            "/projects/:project_id/members/:member_id",
            delete(remove_member),
        )
}

#[instrument(skip(state))]
pub async fn list_projects(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<ProjectView>>, AppError> {
    let store = state.store.as_ref();
    let projects = services::list_my_projects(store, &caller).await?;
    Ok(Json(services::render_many(store, projects).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_project(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectView>), AppError> {
    let store = state.store.as_ref();
    let project =
        services::create_project(store, &caller, &payload.name, &payload.description).await?;
    Ok((StatusCode::CREATED, Json(services::render(store, project).await?)))
}

#[instrument(skip(state))]
pub async fn get_project(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectView>, AppError> {
    let store = state.store.as_ref();
    let project = services::get_project(store, &caller, project_id).await?;
    Ok(Json(services::render(store, project).await?))
}

#[instrument(skip(state, payload))]
pub async fn add_member(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<Json<ProjectView>, AppError> {
    let store = state.store.as_ref();
    let project = services::add_member(store, &caller, project_id, &payload.email).await?;
    Ok(Json(services::render(store, project).await?))
}

#[instrument(skip(state))]
pub async fn remove_member(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ProjectView>, AppError> {
    let store = state.store.as_ref();
    let project = services::remove_member(store, &caller, project_id, member_id).await?;
    Ok(Json(services::render(store, project).await?))
}
