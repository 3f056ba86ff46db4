use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::dto::{
    common::PaginatedResponse,
    padel_match::{CreateMatchRequest, MatchListQuery, MatchResponse, UpdateMatchStatusRequest},
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/matches",
    params(MatchListQuery),
    responses(
        (status = 200, description = "Public matches ordered by start time", body = PaginatedResponse<MatchResponse>),
        (status = 400, description = "Invalid query parameters")
    ),
    tag = "matches"
)]
pub async fn list_matches(
    State(state): State<AppState>,
    Query(query): Query<MatchListQuery>,
) -> ApiResult<Response> {
    let (matches, total_items) = state.matches.list_matches(&query).await?;

    let response = PaginatedResponse::new(
        matches.into_iter().map(MatchResponse::from).collect(),
        query.page,
        query.page_size,
        total_items,
    );

    Ok(Json(response).into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches",
    request_body = CreateMatchRequest,
    params(
        ("x-user-id" = Uuid, Header, description = "Authenticated user")
    ),
    responses(
        (status = 201, description = "Match created with its creator joined", body = MatchResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid user")
    ),
    tag = "matches"
)]
pub async fn create_match(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(req): Json<CreateMatchRequest>,
) -> ApiResult<Response> {
    let created = state.matches.create_match(req, user_id).await?;

    Ok((StatusCode::CREATED, Json(MatchResponse::from(created))).into_response())
}

#[utoipa::path(
    get,
    path = "/api/matches/{match_id}",
    params(
        ("match_id" = Uuid, Path, description = "Match ID")
    ),
    responses(
        (status = 200, description = "Match found", body = MatchResponse),
        (status = 404, description = "Match not found")
    ),
    tag = "matches"
)]
pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> ApiResult<Response> {
    let found = state.matches.get_match(match_id).await?;

    Ok(Json(MatchResponse::from(found)).into_response())
}

#[utoipa::path(
    patch,
    path = "/api/matches/{match_id}/status",
    params(
        ("match_id" = Uuid, Path, description = "Match ID"),
        ("x-user-id" = Uuid, Header, description = "Authenticated user")
    ),
    request_body = UpdateMatchStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = MatchResponse),
        (status = 403, description = "Caller did not create the match"),
        (status = 404, description = "Match not found"),
        (status = 409, description = "Transition not allowed")
    ),
    tag = "matches"
)]
pub async fn update_match_status(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(match_id): Path<Uuid>,
    Json(req): Json<UpdateMatchStatusRequest>,
) -> ApiResult<Response> {
    let updated = state
        .matches
        .update_status(match_id, user_id, req.status)
        .await?;

    Ok(Json(MatchResponse::from(updated)).into_response())
}
