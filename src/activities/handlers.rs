use axum::{extract::State, http::StatusCode, routing::get, Router};
use tracing::instrument;

use super::{
    dto::{ActivityView, DashboardMetrics, RecordActivityRequest},
    services,
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::Json,
    state::AppState,
};

pub fn activity_routes() -> Router<AppState> {
    Router::new()
        .route("/activities", get(list_activities).post(record_activity))
        .route("/dashboard/metrics", get(dashboard_metrics))
}

#[instrument(skip(state))]
pub async fn list_activities(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Json<Vec<ActivityView>>, AppError> {
    let rows = services::list(state.store.as_ref()).await?;
    Ok(Json(rows.into_iter().map(ActivityView::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn record_activity(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<RecordActivityRequest>,
) -> Result<(StatusCode, Json<ActivityView>), AppError> {
    let activity = services::record(state.store.as_ref(), &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(activity.into())))
}

#[instrument(skip(state))]
pub async fn dashboard_metrics(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<DashboardMetrics>, AppError> {
    Ok(Json(services::metrics(state.store.as_ref(), &caller).await?))
}
