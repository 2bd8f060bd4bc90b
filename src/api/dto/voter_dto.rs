//! Voter DTOs: login and account administration.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::Voter;

/// Request body for `POST /voters/login`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VoterLoginRequest {
    /// Display name (at least 2 characters).
    pub name: String,
    /// Email; required when the gateway keys voters by email.
    #[serde(default)]
    pub email: Option<String>,
}

/// Response body for `POST /voters/login`.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoterLoginResponse {
    /// The voter account; its `id` goes in the `x-voter-id` header.
    pub voter: Voter,
    /// `name` or `email`.
    pub identity_mode: String,
}

/// Request body for `PATCH /admin/voters/{id}/verify`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetVerifiedRequest {
    /// New verification flag.
    pub is_verified: bool,
}

/// Response body for `GET /admin/voters`.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoterListResponse {
    /// Voters on this page, newest first.
    pub data: Vec<Voter>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
