use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use storage::dto::participant::{AttendanceRequest, ParticipantResponse, ParticipationResponse};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/matches/{match_id}/participants",
    params(
        ("match_id" = Uuid, Path, description = "Match ID")
    ),
    responses(
        (status = 200, description = "Participants in join order", body = Vec<ParticipantResponse>),
        (status = 404, description = "Match not found")
    ),
    tag = "participants"
)]
pub async fn list_participants(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> ApiResult<Response> {
    let participants = state.matches.list_participants(match_id).await?;

    let response: Vec<ParticipantResponse> = participants
        .into_iter()
        .map(ParticipantResponse::from)
        .collect();

    Ok(Json(response).into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches/{match_id}/join",
    params(
        ("match_id" = Uuid, Path, description = "Match ID"),
        ("x-user-id" = Uuid, Header, description = "Authenticated user")
    ),
    responses(
        (status = 200, description = "Caller is in the match", body = ParticipationResponse),
        (status = 404, description = "Match not found"),
        (status = 409, description = "Match full or not open")
    ),
    tag = "participants"
)]
pub async fn join_match(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(match_id): Path<Uuid>,
) -> ApiResult<Response> {
    let joined = state.matches.join_match(match_id, user_id).await?;

    Ok(Json(ParticipationResponse::from(joined)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches/{match_id}/leave",
    params(
        ("match_id" = Uuid, Path, description = "Match ID"),
        ("x-user-id" = Uuid, Header, description = "Authenticated user")
    ),
    responses(
        (status = 200, description = "Caller left the match", body = ParticipationResponse),
        (status = 404, description = "Match not found"),
        (status = 409, description = "Caller is not in the match or match not open")
    ),
    tag = "participants"
)]
pub async fn leave_match(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(match_id): Path<Uuid>,
) -> ApiResult<Response> {
    let left = state.matches.leave_match(match_id, user_id).await?;

    Ok(Json(ParticipationResponse::from(left)).into_response())
}

#[utoipa::path(
    put,
    path = "/api/matches/{match_id}/attendance",
    params(
        ("match_id" = Uuid, Path, description = "Match ID"),
        ("x-user-id" = Uuid, Header, description = "Authenticated user")
    ),
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Attendance updated", body = ParticipationResponse),
        (status = 400, description = "Status must be joined or maybe"),
        (status = 404, description = "Match not found"),
        (status = 409, description = "Transition not allowed or match full")
    ),
    tag = "participants"
)]
pub async fn set_attendance(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(match_id): Path<Uuid>,
    Json(req): Json<AttendanceRequest>,
) -> ApiResult<Response> {
    let updated = state
        .matches
        .set_attendance(match_id, user_id, req.status)
        .await?;

    Ok(Json(ParticipationResponse::from(updated)).into_response())
}
