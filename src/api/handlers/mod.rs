//! REST endpoint handlers organized by audience.

pub mod admin;
pub mod public;
pub mod system;
pub mod voter;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(admin::routes())
        .merge(voter::routes())
        .merge(public::routes())
}
