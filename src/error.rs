//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::EventId;
use crate::persistence::StoreError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2004,
///     "message": "you already voted for Red",
///     "details": { "voted_for": "Red" }
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`GatewayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional machine-readable details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                        |
/// |-----------|---------------------|------------------------------------|
/// | 1000–1999 | Validation / Access | 400 / 401 / 403 / 422              |
/// | 2000–2999 | State / Not Found   | 404 Not Found / 409 Conflict       |
/// | 3000–3999 | Server / Storage    | 500 / 503                          |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Malformed event or login input.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Team name is not among the event's teams.
    #[error("invalid team selection: {0}")]
    InvalidTeamSelection(String),

    /// Caller identity missing or malformed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Voter must be verified before voting.
    #[error("voter is not verified")]
    VoterNotVerified,

    /// Event with the given ID does not exist (or is not visible to the caller).
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// Any other referenced entity is missing.
    #[error("{0} not found")]
    NotFound(String),

    /// Event is inactive or outside its voting window.
    #[error("event {0} is not open for voting")]
    EventNotOpen(EventId),

    /// The voter already has a vote in this event.
    #[error("you already voted for {voted_for}")]
    DuplicateVote {
        /// Team chosen by the existing vote.
        voted_for: String,
    },

    /// Store stayed unreachable after retries.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Non-transient persistence failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::InvalidTeamSelection(_) => 1002,
            Self::Unauthorized(_) => 1401,
            Self::VoterNotVerified => 1403,
            Self::EventNotFound(_) => 2001,
            Self::NotFound(_) => 2002,
            Self::EventNotOpen(_) => 2003,
            Self::DuplicateVote { .. } => 2004,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::StorageUnavailable(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidTeamSelection(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::VoterNotVerified => StatusCode::FORBIDDEN,
            Self::EventNotFound(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::EventNotOpen(_) | Self::DuplicateVote { .. } => StatusCode::CONFLICT,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns machine-readable details for variants that carry any.
    #[must_use]
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::DuplicateVote { voted_for } => {
                Some(serde_json::json!({ "voted_for": voted_for }))
            }
            _ => None,
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(_) | StoreError::Timeout { .. } => {
                Self::StorageUnavailable(err.to_string())
            }
            StoreError::Conflict(_) | StoreError::Backend(_) => {
                Self::PersistenceError(err.to_string())
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_vote_is_informational_conflict() {
        let err = GatewayError::DuplicateVote {
            voted_for: "Red".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "you already voted for Red");
        assert_eq!(
            err.details(),
            Some(serde_json::json!({ "voted_for": "Red" }))
        );
    }

    #[test]
    fn store_errors_map_to_storage_classes() {
        let transient: GatewayError = StoreError::Unavailable("reset".to_string()).into();
        assert_eq!(transient.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let timeout: GatewayError = StoreError::Timeout { op: "get_event" }.into();
        assert_eq!(timeout.error_code(), 3002);
        let fatal: GatewayError = StoreError::Backend("syntax".to_string()).into();
        assert_eq!(fatal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn client_errors_use_4xx() {
        assert_eq!(
            GatewayError::EventNotOpen(EventId::new()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            GatewayError::InvalidTeamSelection("C".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            GatewayError::Unauthorized("missing".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
