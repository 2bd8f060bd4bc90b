//! REST API layer: route handlers, DTOs, identity extractors, and router
//! composition.
//!
//! All resource endpoints are mounted under `/api/v1`; `/health` and `/ws`
//! live at the root.

pub mod dto;
pub mod handlers;
pub mod identity;

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "vote-gateway", description = "Timed team-voting events over REST and WebSocket"),
    paths(
        handlers::system::health_handler,
        handlers::admin::create_event,
        handlers::admin::list_events,
        handlers::admin::get_event,
        handlers::admin::update_event,
        handlers::admin::set_event_active,
        handlers::admin::delete_event,
        handlers::admin::list_voters,
        handlers::admin::set_voter_verified,
        handlers::admin::dashboard,
        handlers::voter::login,
        handlers::voter::list_open_events,
        handlers::voter::get_ballot,
        handlers::voter::cast_vote,
        handlers::voter::vote_status,
        handlers::voter::history,
        handlers::public::event_results,
        handlers::public::list_public_events,
        handlers::public::get_public_event,
        handlers::public::public_results,
    ),
    tags(
        (name = "System", description = "Health"),
        (name = "Admin", description = "Event management for administrators"),
        (name = "Voters", description = "Login, ballots, and vote casting"),
        (name = "Results", description = "Live tallies"),
        (name = "Public", description = "Anonymous access by voting link"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

/// Builds the full application: REST routes, the `/ws` endpoint, and the
/// HTTP middleware stack.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(build_router())
        .route("/ws", get(ws_handler))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
