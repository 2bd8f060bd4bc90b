//! Request extractors for caller identity and submission metadata.
//!
//! Authentication happens upstream; the gateway only needs the caller's id.
//! Administrators arrive with `x-admin-id`, voters with `x-voter-id`, both
//! carrying a UUID. A missing or malformed header is rejected with 401.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::domain::{AdminId, VoteMetadata, VoterId};
use crate::error::GatewayError;

/// Header carrying the authenticated administrator's id.
pub const ADMIN_ID_HEADER: &str = "x-admin-id";

/// Header carrying the authenticated voter's id.
pub const VOTER_ID_HEADER: &str = "x-voter-id";

/// The authenticated administrator.
#[derive(Debug, Clone, Copy)]
pub struct AdminIdentity(pub AdminId);

impl<S> FromRequestParts<S> for AdminIdentity
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_id(&parts.headers, ADMIN_ID_HEADER).map(|id| Self(AdminId::from_uuid(id)))
    }
}

/// The authenticated voter.
#[derive(Debug, Clone, Copy)]
pub struct VoterIdentity(pub VoterId);

impl<S> FromRequestParts<S> for VoterIdentity
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_id(&parts.headers, VOTER_ID_HEADER).map(|id| Self(VoterId::from_uuid(id)))
    }
}

/// Origin address and user-agent of a vote submission. Never fails.
#[derive(Debug, Clone, Default)]
pub struct Submission(pub VoteMetadata);

impl<S> FromRequestParts<S> for Submission
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(metadata_from_headers(&parts.headers)))
    }
}

/// First hop of `x-forwarded-for` (or `x-real-ip`) plus `user-agent`.
#[must_use]
pub fn metadata_from_headers(headers: &HeaderMap) -> VoteMetadata {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let ip_address = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .map(str::to_string);

    VoteMetadata {
        ip_address,
        user_agent: header("user-agent").map(str::to_string),
    }
}

fn header_id(headers: &HeaderMap, name: &'static str) -> Result<uuid::Uuid, GatewayError> {
    let raw = headers
        .get(name)
        .ok_or_else(|| GatewayError::Unauthorized(format!("missing {name} header")))?;
    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse::<uuid::Uuid>().ok())
        .ok_or_else(|| GatewayError::Unauthorized(format!("malformed {name} header")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let Ok(req) = builder.body(()) else {
            panic!("valid request");
        };
        req.into_parts().0
    }

    #[tokio::test]
    async fn voter_id_is_read_from_header() {
        let id = VoterId::new();
        let mut p = parts(&[(VOTER_ID_HEADER, &id.to_string())]);
        let Ok(VoterIdentity(got)) = VoterIdentity::from_request_parts(&mut p, &()).await else {
            panic!("expected identity");
        };
        assert_eq!(got, id);
    }

    #[tokio::test]
    async fn missing_or_malformed_admin_header_is_unauthorized() {
        let mut missing = parts(&[]);
        assert!(matches!(
            AdminIdentity::from_request_parts(&mut missing, &()).await,
            Err(GatewayError::Unauthorized(_))
        ));

        let mut malformed = parts(&[(ADMIN_ID_HEADER, "admin")]);
        assert!(matches!(
            AdminIdentity::from_request_parts(&mut malformed, &()).await,
            Err(GatewayError::Unauthorized(_))
        ));
    }

    #[test]
    fn metadata_takes_first_forwarded_hop() {
        let p = parts(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("user-agent", "curl/8.0"),
        ]);
        let meta = metadata_from_headers(&p.headers);
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn metadata_falls_back_to_real_ip() {
        let p = parts(&[("x-real-ip", "198.51.100.2")]);
        let meta = metadata_from_headers(&p.headers);
        assert_eq!(meta.ip_address.as_deref(), Some("198.51.100.2"));
        assert_eq!(meta.user_agent, None);
    }
}
