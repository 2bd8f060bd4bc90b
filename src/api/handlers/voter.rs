//! Voter handlers: login, ballots, vote casting, status, and history.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CastVoteRequest, CastVoteResponse, HistoryResponse, OpenEventListResponse,
    VoterLoginRequest, VoterLoginResponse,
};
use crate::api::identity::{Submission, VoterIdentity};
use crate::app_state::AppState;
use crate::domain::EventId;
use crate::error::{ErrorResponse, GatewayError};
use crate::service::{Ballot, VoteStatus};

/// `POST /voters/login`: Find or create a voter account.
///
/// # Errors
///
/// Returns [`GatewayError::Validation`] for a short name or missing email.
#[utoipa::path(
    post,
    path = "/api/v1/voters/login",
    tag = "Voters",
    summary = "Voter login",
    description = "Resolves the login to a voter account, creating it on first use. The returned id is sent as `x-voter-id` afterwards.",
    request_body = VoterLoginRequest,
    responses(
        (status = 200, description = "Voter account", body = VoterLoginResponse),
        (status = 400, description = "Invalid login", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<VoterLoginRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let voter = state
        .voter_service
        .login(&req.name, req.email.as_deref())
        .await?;
    Ok(Json(VoterLoginResponse {
        voter,
        identity_mode: state.voter_service.identity_mode().to_string(),
    }))
}

/// `GET /voter/events`: Open events with the caller's `has_voted` flag.
///
/// # Errors
///
/// Returns a storage error.
#[utoipa::path(
    get,
    path = "/api/v1/voter/events",
    tag = "Voters",
    summary = "List open events",
    params(("x-voter-id" = uuid::Uuid, Header, description = "Voter id")),
    responses(
        (status = 200, description = "Open events", body = OpenEventListResponse),
        (status = 401, description = "Missing voter identity", body = ErrorResponse),
    )
)]
pub async fn list_open_events(
    State(state): State<AppState>,
    VoterIdentity(voter): VoterIdentity,
) -> Result<impl IntoResponse, GatewayError> {
    let data = state.event_service.list_open_for_voter(voter).await?;
    Ok(Json(OpenEventListResponse { data }))
}

/// `GET /voter/events/{id}`: An open event and the caller's vote status.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] or [`GatewayError::EventNotOpen`].
#[utoipa::path(
    get,
    path = "/api/v1/voter/events/{id}",
    tag = "Voters",
    summary = "Get ballot",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
        ("x-voter-id" = uuid::Uuid, Header, description = "Voter id"),
    ),
    responses(
        (status = 200, description = "Event and vote status", body = Ballot),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Voting is not open", body = ErrorResponse),
    )
)]
pub async fn get_ballot(
    State(state): State<AppState>,
    VoterIdentity(voter): VoterIdentity,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.vote_service.ballot(id, voter).await?))
}

/// `POST /voter/events/{id}/vote`: Cast the caller's vote.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`], [`GatewayError::EventNotOpen`],
/// [`GatewayError::InvalidTeamSelection`], [`GatewayError::VoterNotVerified`],
/// or [`GatewayError::DuplicateVote`].
#[utoipa::path(
    post,
    path = "/api/v1/voter/events/{id}/vote",
    tag = "Voters",
    summary = "Cast a vote",
    description = "Admits at most one vote per voter per event. A second attempt is rejected with the previously chosen team in `details.voted_for`.",
    request_body = CastVoteRequest,
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
        ("x-voter-id" = uuid::Uuid, Header, description = "Voter id"),
    ),
    responses(
        (status = 201, description = "Vote admitted", body = CastVoteResponse),
        (status = 403, description = "Voter not verified", body = ErrorResponse),
        (status = 404, description = "Event or voter not found", body = ErrorResponse),
        (status = 409, description = "Voting closed or already voted", body = ErrorResponse),
        (status = 422, description = "Team is not part of the event", body = ErrorResponse),
        (status = 503, description = "Storage unavailable; check vote status before retrying", body = ErrorResponse),
    )
)]
pub async fn cast_vote(
    State(state): State<AppState>,
    VoterIdentity(voter): VoterIdentity,
    Submission(metadata): Submission,
    Path(id): Path<EventId>,
    Json(req): Json<CastVoteRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let vote = state
        .vote_service
        .admit_vote(id, voter, &req.team, metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(CastVoteResponse::from(vote))))
}

/// `GET /voter/events/{id}/vote-status`: Whether the caller has voted.
///
/// # Errors
///
/// Returns a storage error.
#[utoipa::path(
    get,
    path = "/api/v1/voter/events/{id}/vote-status",
    tag = "Voters",
    summary = "Get vote status",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
        ("x-voter-id" = uuid::Uuid, Header, description = "Voter id"),
    ),
    responses(
        (status = 200, description = "Vote status", body = VoteStatus),
    )
)]
pub async fn vote_status(
    State(state): State<AppState>,
    VoterIdentity(voter): VoterIdentity,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.vote_service.vote_status(id, voter).await?))
}

/// `GET /voter/history`: The caller's votes, newest first.
///
/// # Errors
///
/// Returns a storage error.
#[utoipa::path(
    get,
    path = "/api/v1/voter/history",
    tag = "Voters",
    summary = "Voting history",
    params(("x-voter-id" = uuid::Uuid, Header, description = "Voter id")),
    responses(
        (status = 200, description = "Voting history", body = HistoryResponse),
    )
)]
pub async fn history(
    State(state): State<AppState>,
    VoterIdentity(voter): VoterIdentity,
) -> Result<impl IntoResponse, GatewayError> {
    let data = state.vote_service.history(voter).await?;
    Ok(Json(HistoryResponse { data }))
}

/// Voter routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/voters/login", post(login))
        .route("/voter/events", get(list_open_events))
        .route("/voter/events/{id}", get(get_ballot))
        .route("/voter/events/{id}/vote", post(cast_vote))
        .route("/voter/events/{id}/vote-status", get(vote_status))
        .route("/voter/history", get(history))
}
