//! Public handlers: open-event discovery and live results. No identity needed.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{PublicEventDto, PublicEventListResponse, PublicResultsResponse};
use crate::app_state::AppState;
use crate::domain::{EventId, TallyStats};
use crate::error::{ErrorResponse, GatewayError};

/// `GET /events/{id}/results`: Live tally by event id.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`].
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/results",
    tag = "Results",
    summary = "Get event results",
    description = "Tally recomputed from the vote ledger on every call.",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Tally", body = TallyStats),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn event_results(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.vote_service.compute_stats(id).await?))
}

/// `GET /public/events`: Events open right now.
///
/// # Errors
///
/// Returns a storage error.
#[utoipa::path(
    get,
    path = "/api/v1/public/events",
    tag = "Public",
    summary = "Discover open events",
    responses(
        (status = 200, description = "Open events, ending soonest first", body = PublicEventListResponse),
    )
)]
pub async fn list_public_events(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    let events = state.event_service.list_open().await?;
    Ok(Json(PublicEventListResponse {
        data: events.iter().map(PublicEventDto::from).collect(),
    }))
}

/// `GET /public/events/{slug}`: An open event by voting link.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if no open event has that slug.
#[utoipa::path(
    get,
    path = "/api/v1/public/events/{slug}",
    tag = "Public",
    summary = "Get event by voting link",
    params(("slug" = String, Path, description = "Voting slug")),
    responses(
        (status = 200, description = "Open event", body = PublicEventDto),
        (status = 404, description = "No open event for this link", body = ErrorResponse),
    )
)]
pub async fn get_public_event(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let event = state.event_service.get_by_slug(&slug).await?;
    Ok(Json(PublicEventDto::from(&event)))
}

/// `GET /public/events/{slug}/results`: Live tally by voting link.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] for an unknown slug.
#[utoipa::path(
    get,
    path = "/api/v1/public/events/{slug}/results",
    tag = "Public",
    summary = "Get results by voting link",
    description = "Available whether or not voting is still open.",
    params(("slug" = String, Path, description = "Voting slug")),
    responses(
        (status = 200, description = "Event and tally", body = PublicResultsResponse),
        (status = 404, description = "Unknown voting link", body = ErrorResponse),
    )
)]
pub async fn public_results(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let (event, stats) = state.vote_service.compute_stats_by_slug(&slug).await?;
    Ok(Json(PublicResultsResponse {
        event: PublicEventDto::from(&event),
        stats,
    }))
}

/// Public routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/{id}/results", get(event_results))
        .route("/public/events", get(list_public_events))
        .route("/public/events/{slug}", get(get_public_event))
        .route("/public/events/{slug}/results", get(public_results))
}
