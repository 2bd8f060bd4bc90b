//! Voter service: login and account verification.

use std::sync::Arc;

use crate::domain::{IdentityMode, Voter, VoterId, VoterLogin};
use crate::error::GatewayError;
use crate::persistence::{RetryPolicy, VoteStore};

/// Orchestration layer for voter accounts.
#[derive(Debug, Clone)]
pub struct VoterService {
    store: Arc<dyn VoteStore>,
    retry: RetryPolicy,
    identity_mode: IdentityMode,
}

impl VoterService {
    /// Creates a new `VoterService`.
    #[must_use]
    pub fn new(store: Arc<dyn VoteStore>, retry: RetryPolicy, identity_mode: IdentityMode) -> Self {
        Self {
            store,
            retry,
            identity_mode,
        }
    }

    /// The identity mode logins are resolved under.
    #[must_use]
    pub const fn identity_mode(&self) -> IdentityMode {
        self.identity_mode
    }

    /// Finds or creates the voter matching the login.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] for bad input, or a storage
    /// error.
    pub async fn login(&self, name: &str, email: Option<&str>) -> Result<Voter, GatewayError> {
        let login = VoterLogin::resolve(self.identity_mode, name, email)?;
        let voter = self
            .retry
            .run("upsert_voter", || self.store.upsert_voter(&login))
            .await?;
        tracing::debug!(voter_id = %voter.id, mode = %self.identity_mode, "voter logged in");
        Ok(voter)
    }

    /// Fetches a voter.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the voter does not exist.
    pub async fn get(&self, id: VoterId) -> Result<Voter, GatewayError> {
        self.retry
            .run("get_voter", || self.store.get_voter(id))
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("voter {id}")))
    }

    /// All voters, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list(&self) -> Result<Vec<Voter>, GatewayError> {
        Ok(self.retry.run("list_voters", || self.store.list_voters()).await?)
    }

    /// Sets a voter's verification flag.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the voter does not exist.
    pub async fn set_verified(&self, id: VoterId, verified: bool) -> Result<Voter, GatewayError> {
        let voter = self
            .retry
            .run("set_voter_verified", || self.store.set_voter_verified(id, verified))
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("voter {id}")))?;
        tracing::info!(voter_id = %id, verified, "voter verification changed");
        Ok(voter)
    }
}
