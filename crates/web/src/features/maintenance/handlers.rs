use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use storage::{
    dto::maintenance::{RecountResponse, RepairReport},
    models::CounterDrift,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/admin/participant-counts/drift",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Matches whose cached counter disagrees with their participants", body = Vec<CounterDrift>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "maintenance"
)]
pub async fn list_counter_drift(State(state): State<AppState>) -> ApiResult<Response> {
    let drift = state.counts().check_consistency().await?;

    Ok(Json(drift).into_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/participant-counts/repair",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Every counter recomputed", body = RepairReport),
        (status = 401, description = "Unauthorized")
    ),
    tag = "maintenance"
)]
pub async fn repair_counters(State(state): State<AppState>) -> ApiResult<Response> {
    let report = state.counts().repair_all().await?;

    Ok(Json(report).into_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/matches/{match_id}/recount",
    params(
        ("match_id" = Uuid, Path, description = "Match ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Counter recomputed", body = RecountResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Match not found")
    ),
    tag = "maintenance"
)]
pub async fn recount_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> ApiResult<Response> {
    let current_players = state.counts().recount(match_id).await?;

    Ok(Json(RecountResponse {
        match_id,
        current_players,
    })
    .into_response())
}
