//! Administrator handlers: event management, voter verification, dashboard.
//!
//! Every route requires the `x-admin-id` header. Events are scoped to the
//! calling administrator.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::api::dto::{
    CreateEventRequest, EventListResponse, PaginationParams, SetActiveRequest,
    SetVerifiedRequest, UpdateEventRequest, VoterListResponse,
};
use crate::api::identity::AdminIdentity;
use crate::app_state::AppState;
use crate::domain::{Event, EventId, Voter, VoterId};
use crate::error::{ErrorResponse, GatewayError};
use crate::service::{Dashboard, EventDetail};

/// `POST /admin/events`: Create an event.
///
/// # Errors
///
/// Returns [`GatewayError::Validation`] on invalid input.
#[utoipa::path(
    post,
    path = "/api/v1/admin/events",
    tag = "Admin",
    summary = "Create an event",
    description = "Creates a voting event owned by the caller. Teams get stable ids and the event gets a random voting slug.",
    request_body = CreateEventRequest,
    params(("x-admin-id" = uuid::Uuid, Header, description = "Administrator id")),
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Invalid event", body = ErrorResponse),
        (status = 401, description = "Missing admin identity", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let event = state.event_service.create(admin, req.into()).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /admin/events`: List the caller's events.
///
/// # Errors
///
/// Returns a storage error.
#[utoipa::path(
    get,
    path = "/api/v1/admin/events",
    tag = "Admin",
    summary = "List own events",
    description = "Returns the caller's events, newest first, paginated.",
    params(
        ("x-admin-id" = uuid::Uuid, Header, description = "Administrator id"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Paginated event list", body = EventListResponse),
        (status = 401, description = "Missing admin identity", body = ErrorResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let events = state.event_service.list_for_admin(admin).await?;
    let (data, pagination) = params.paginate(events);
    Ok(Json(EventListResponse { data, pagination }))
}

/// `GET /admin/events/{id}`: Event detail with tally and voter list.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] if the caller does not own it.
#[utoipa::path(
    get,
    path = "/api/v1/admin/events/{id}",
    tag = "Admin",
    summary = "Get event detail",
    description = "Returns the event, its ledger-derived tally, and who voted for which team.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
        ("x-admin-id" = uuid::Uuid, Header, description = "Administrator id"),
    ),
    responses(
        (status = 200, description = "Event detail", body = EventDetail),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.event_service.detail_for_admin(admin, id).await?))
}

/// `PUT /admin/events/{id}`: Partially update an event.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] or [`GatewayError::Validation`].
#[utoipa::path(
    put,
    path = "/api/v1/admin/events/{id}",
    tag = "Admin",
    summary = "Update an event",
    description = "Applies the present fields and revalidates the event. Teams keep their identity when sent with their id; a team that already has votes cannot be removed.",
    request_body = UpdateEventRequest,
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
        ("x-admin-id" = uuid::Uuid, Header, description = "Administrator id"),
    ),
    responses(
        (status = 200, description = "Updated event", body = Event),
        (status = 400, description = "Invalid update", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<EventId>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.event_service.update(admin, id, req.into()).await?))
}

/// `PATCH /admin/events/{id}/active`: Flip the kill switch.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`].
#[utoipa::path(
    patch,
    path = "/api/v1/admin/events/{id}/active",
    tag = "Admin",
    summary = "Activate or deactivate an event",
    request_body = SetActiveRequest,
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
        ("x-admin-id" = uuid::Uuid, Header, description = "Administrator id"),
    ),
    responses(
        (status = 200, description = "Updated event", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn set_event_active(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<EventId>,
    Json(req): Json<SetActiveRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(
        state
            .event_service
            .set_active(admin, id, req.is_active)
            .await?,
    ))
}

/// `DELETE /admin/events/{id}`: Delete an event and all its votes.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`].
#[utoipa::path(
    delete,
    path = "/api/v1/admin/events/{id}",
    tag = "Admin",
    summary = "Delete an event",
    description = "Irreversibly removes the event together with every vote cast in it.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
        ("x-admin-id" = uuid::Uuid, Header, description = "Administrator id"),
    ),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, GatewayError> {
    state.event_service.delete(admin, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /admin/voters`: List voter accounts.
///
/// # Errors
///
/// Returns a storage error.
#[utoipa::path(
    get,
    path = "/api/v1/admin/voters",
    tag = "Admin",
    summary = "List voters",
    params(
        ("x-admin-id" = uuid::Uuid, Header, description = "Administrator id"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Paginated voter list", body = VoterListResponse),
    )
)]
pub async fn list_voters(
    State(state): State<AppState>,
    AdminIdentity(_admin): AdminIdentity,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let voters = state.voter_service.list().await?;
    let (data, pagination) = params.paginate(voters);
    Ok(Json(VoterListResponse { data, pagination }))
}

/// `PATCH /admin/voters/{id}/verify`: Set a voter's verification flag.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if the voter does not exist.
#[utoipa::path(
    patch,
    path = "/api/v1/admin/voters/{id}/verify",
    tag = "Admin",
    summary = "Verify a voter",
    request_body = SetVerifiedRequest,
    params(
        ("id" = uuid::Uuid, Path, description = "Voter UUID"),
        ("x-admin-id" = uuid::Uuid, Header, description = "Administrator id"),
    ),
    responses(
        (status = 200, description = "Updated voter", body = Voter),
        (status = 404, description = "Voter not found", body = ErrorResponse),
    )
)]
pub async fn set_voter_verified(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<VoterId>,
    Json(req): Json<SetVerifiedRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let voter = state.voter_service.set_verified(id, req.is_verified).await?;
    tracing::debug!(%admin, voter_id = %id, "verification set by admin");
    Ok(Json(voter))
}

/// `GET /admin/dashboard`: Counters and recent activity.
///
/// # Errors
///
/// Returns a storage error.
#[utoipa::path(
    get,
    path = "/api/v1/admin/dashboard",
    tag = "Admin",
    summary = "Admin dashboard",
    description = "Event, voter, and vote counters plus the newest events and votes.",
    params(("x-admin-id" = uuid::Uuid, Header, description = "Administrator id")),
    responses(
        (status = 200, description = "Dashboard", body = Dashboard),
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.event_service.dashboard(admin).await?))
}

/// Admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/events", get(list_events).post(create_event))
        .route(
            "/admin/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/admin/events/{id}/active", patch(set_event_active))
        .route("/admin/voters", get(list_voters))
        .route("/admin/voters/{id}/verify", patch(set_voter_verified))
        .route("/admin/dashboard", get(dashboard))
}
