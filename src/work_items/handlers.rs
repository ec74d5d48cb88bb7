use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{AddCommentRequest, CreateWorkItemRequest, UpdateWorkItemRequest, WorkItemView},
    services,
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{Json, Path},
    state::AppState,
};

pub fn work_item_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/:project_id/workitems",
            get(list_work_items).post(create_work_item),
        )
        .route(
            "/projects/:project_id/workitems/:work_item_id",
            put(update_work_item),
        )
        .route(
            "/projects/:project_id/workitems/:work_item_id/comments",
            post(add_comment),
        )
}

#[instrument(skip(state))]
pub async fn list_work_items(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<WorkItemView>>, AppError> {
    let store = state.store.as_ref();
    let items = services::list_for_project(store, &caller, project_id).await?;
    Ok(Json(services::render_many(store, items).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_work_item(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateWorkItemRequest>,
) -> Result<(StatusCode, Json<WorkItemView>), AppError> {
    let store = state.store.as_ref();
    let item = services::create(store, &caller, project_id, payload).await?;
    Ok((StatusCode::CREATED, Json(services::render(store, item).await?)))
}

#[instrument(skip(state, payload))]
pub async fn update_work_item(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((project_id, work_item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateWorkItemRequest>,
) -> Result<Json<WorkItemView>, AppError> {
    let store = state.store.as_ref();
    let item = services::update(store, &caller, project_id, work_item_id, payload).await?;
    Ok(Json(services::render(store, item).await?))
}

#[instrument(skip(state, payload))]
pub async fn add_comment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((project_id, work_item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AddCommentRequest>,
) -> Result<Json<WorkItemView>, AppError> {
    let store = state.store.as_ref();
    let item =
        services::add_comment(store, &caller, project_id, work_item_id, &payload.content).await?;
    Ok(Json(services::render(store, item).await?))
}
