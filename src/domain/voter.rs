//! Voter accounts and the identity policy used to key them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::VoterId;
use crate::error::GatewayError;

/// Minimum length of a trimmed voter name.
pub const MIN_VOTER_NAME_LEN: usize = 2;

/// How voter logins map onto accounts.
///
/// `NameOnly` is the low-friction mode: whoever types a name becomes (or
/// resumes) that voter, and two people entering the same name share one
/// account. `VerifiedEmail` keys accounts on email and requires an admin to
/// verify a voter before their votes are admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    /// Keyed by display name, auto-verified.
    #[default]
    NameOnly,
    /// Keyed by email, verified by an administrator.
    VerifiedEmail,
}

impl FromStr for IdentityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" | "name_only" => Ok(Self::NameOnly),
            "email" | "verified_email" => Ok(Self::VerifiedEmail),
            other => Err(format!("unknown voter identity mode: {other}")),
        }
    }
}

impl fmt::Display for IdentityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameOnly => f.write_str("name"),
            Self::VerifiedEmail => f.write_str("email"),
        }
    }
}

/// A registered voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Voter {
    /// Account identifier.
    pub id: VoterId,
    /// Display name.
    pub name: String,
    /// Contact email (derived placeholder in name-only mode).
    pub email: Option<String>,
    /// Unique login key: the name or the lowercased email.
    #[serde(skip_serializing)]
    pub identity_key: String,
    /// Whether the voter may cast votes under `VerifiedEmail`.
    pub is_verified: bool,
    /// Time of the most recent admitted vote.
    pub last_vote_at: Option<DateTime<Utc>>,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

/// Normalized login attempt produced by [`VoterLogin::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterLogin {
    /// Display name.
    pub name: String,
    /// Email stored on the account.
    pub email: Option<String>,
    /// Unique login key.
    pub identity_key: String,
    /// Verification flag for a newly created account.
    pub verified_on_create: bool,
}

impl VoterLogin {
    /// Normalizes raw login input according to `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] when the name is too short or,
    /// in `VerifiedEmail` mode, the email is missing or malformed.
    pub fn resolve(
        mode: IdentityMode,
        name: &str,
        email: Option<&str>,
    ) -> Result<Self, GatewayError> {
        let name = name.trim();
        if name.chars().count() < MIN_VOTER_NAME_LEN {
            return Err(GatewayError::Validation(format!(
                "voter name must be at least {MIN_VOTER_NAME_LEN} characters"
            )));
        }

        match mode {
            IdentityMode::NameOnly => Ok(Self {
                name: name.to_string(),
                email: Some(placeholder_email(name)),
                identity_key: name.to_string(),
                verified_on_create: true,
            }),
            IdentityMode::VerifiedEmail => {
                let email = email
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| is_plausible_email(e))
                    .ok_or_else(|| {
                        GatewayError::Validation("a valid email is required".to_string())
                    })?;
                Ok(Self {
                    name: name.to_string(),
                    email: Some(email.clone()),
                    identity_key: email,
                    verified_on_create: false,
                })
            }
        }
    }
}

/// `"Jane Doe"` becomes `"jane.doe@voter.local"`.
fn placeholder_email(name: &str) -> String {
    let local = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".");
    format!("{local}@voter.local")
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}
