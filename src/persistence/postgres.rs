//! PostgreSQL implementation of the persistence layer.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use uuid::Uuid;

use super::models::{EventRow, VoteRow, VoterRow, count_from_db, count_to_db};
use super::{EventUpdate, StoreError, VoteInsert, VoteStore};
use crate::config::GatewayConfig;
use crate::domain::{AdminId, Event, EventId, Team, TeamId, Vote, Voter, VoterId, VoterLogin};

const EVENT_COLUMNS: &str = "id, voting_slug, name, description, teams, start_date, end_date, \
     is_active, total_votes, created_by, created_at, updated_at";

const VOTE_COLUMNS: &str =
    "id, event_id, voter_id, team_id, team_name, voted_at, ip_address, user_agent";

const VOTER_COLUMNS: &str =
    "id, name, email, identity_key, is_verified, last_vote_at, created_at";

/// PostgreSQL-backed store using `sqlx::PgPool`.
///
/// The `(event_id, voter_id)` unique index on `votes` is what admits
/// exactly one vote per pair; the insert uses `ON CONFLICT DO NOTHING` and
/// bumps the event counter in the same transaction.
///
/// Vote inserts and event updates both lock the event row first, so a team
/// list change and an admission for the same event are serialized.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the database cannot be reached.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Applies pending schema migrations from `migrations/`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

/// Classifies a driver error: connectivity problems are transient, unique
/// violations are conflicts, anything else is a backend failure.
fn map_sqlx(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(db_err.message().to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

#[async_trait]
impl VoteStore for PostgresStore {
    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO events (id, voting_slug, name, description, teams, start_date, end_date, \
             is_active, total_votes, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(event.id.as_uuid())
        .bind(&event.voting_slug)
        .bind(&event.name)
        .bind(&event.description)
        .bind(Json(&event.teams))
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.is_active)
        .bind(count_to_db(event.total_votes)?)
        .bind(event.created_by.as_uuid())
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(Event::try_from).transpose()
    }

    async fn get_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE voting_slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(Event::try_from).transpose()
    }

    async fn list_events_by_owner(&self, owner: AdminId) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE created_by = $1 ORDER BY created_at DESC"
        ))
        .bind(owner.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn list_open_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE is_active AND start_date <= $1 AND end_date >= $1 \
             ORDER BY end_date ASC"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn update_event(&self, event: &Event) -> Result<EventUpdate, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let locked =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM events WHERE id = $1 FOR UPDATE")
                .bind(event.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx)?;
        if locked.is_none() {
            tx.rollback().await.map_err(map_sqlx)?;
            return Ok(EventUpdate::Missing);
        }

        let kept: Vec<Uuid> = event.teams.iter().map(|t| *t.id.as_uuid()).collect();
        let orphan = sqlx::query_scalar::<_, Uuid>(
            "SELECT team_id FROM votes WHERE event_id = $1 AND team_id <> ALL($2) LIMIT 1",
        )
        .bind(event.id.as_uuid())
        .bind(&kept)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;
        if let Some(team_id) = orphan {
            tx.rollback().await.map_err(map_sqlx)?;
            return Ok(EventUpdate::TeamHasVotes(TeamId::from_uuid(team_id)));
        }

        sqlx::query(
            "UPDATE events SET name = $2, description = $3, teams = $4, start_date = $5, \
             end_date = $6, is_active = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(event.id.as_uuid())
        .bind(&event.name)
        .bind(&event.description)
        .bind(Json(&event.teams))
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.is_active)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(EventUpdate::Updated)
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query("DELETE FROM votes WHERE event_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_vote(&self, vote: &Vote) -> Result<VoteInsert, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let teams = sqlx::query_scalar::<_, Json<Vec<Team>>>(
            "SELECT teams FROM events WHERE id = $1 FOR NO KEY UPDATE",
        )
        .bind(vote.event_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;
        let Some(Json(teams)) = teams else {
            tx.rollback().await.map_err(map_sqlx)?;
            return Err(StoreError::Backend(format!(
                "vote references missing event {}",
                vote.event_id
            )));
        };
        if !teams.iter().any(|t| t.id == vote.team_id) {
            tx.rollback().await.map_err(map_sqlx)?;
            return Ok(VoteInsert::TeamUnavailable);
        }

        let inserted = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO votes (id, event_id, voter_id, team_id, team_name, voted_at, \
             ip_address, user_agent) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (event_id, voter_id) DO NOTHING RETURNING id",
        )
        .bind(vote.id.as_uuid())
        .bind(vote.event_id.as_uuid())
        .bind(vote.voter_id.as_uuid())
        .bind(vote.team_id.as_uuid())
        .bind(&vote.team_name)
        .bind(vote.voted_at)
        .bind(&vote.metadata.ip_address)
        .bind(&vote.metadata.user_agent)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if inserted.is_none() {
            // The conflicting row is committed by now; read it in a fresh statement.
            let existing = sqlx::query_as::<_, VoteRow>(&format!(
                "SELECT {VOTE_COLUMNS} FROM votes WHERE event_id = $1 AND voter_id = $2"
            ))
            .bind(vote.event_id.as_uuid())
            .bind(vote.voter_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx)?;
            tx.rollback().await.map_err(map_sqlx)?;

            return existing
                .map(|row| VoteInsert::Duplicate(row.into()))
                .ok_or_else(|| {
                    StoreError::Backend("conflicting vote disappeared".to_string())
                });
        }

        let total = sqlx::query_scalar::<_, i64>(
            "UPDATE events SET total_votes = total_votes + 1 WHERE id = $1 RETURNING total_votes",
        )
        .bind(vote.event_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        sqlx::query("UPDATE voters SET last_vote_at = $2 WHERE id = $1")
            .bind(vote.voter_id.as_uuid())
            .bind(vote.voted_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;

        Ok(VoteInsert::Inserted {
            total_votes: count_from_db(total)?,
        })
    }

    async fn find_vote(
        &self,
        event: EventId,
        voter: VoterId,
    ) -> Result<Option<Vote>, StoreError> {
        let row = sqlx::query_as::<_, VoteRow>(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE event_id = $1 AND voter_id = $2"
        ))
        .bind(event.as_uuid())
        .bind(voter.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Vote::from))
    }

    async fn votes_for_event(&self, event: EventId) -> Result<Vec<Vote>, StoreError> {
        let rows = sqlx::query_as::<_, VoteRow>(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE event_id = $1 ORDER BY voted_at ASC"
        ))
        .bind(event.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Vote::from).collect())
    }

    async fn votes_by_voter(&self, voter: VoterId) -> Result<Vec<Vote>, StoreError> {
        let rows = sqlx::query_as::<_, VoteRow>(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE voter_id = $1 ORDER BY voted_at DESC"
        ))
        .bind(voter.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Vote::from).collect())
    }

    async fn recent_votes(&self, limit: usize) -> Result<Vec<Vote>, StoreError> {
        let rows = sqlx::query_as::<_, VoteRow>(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes ORDER BY voted_at DESC LIMIT $1"
        ))
        .bind(count_to_db(limit)?)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Vote::from).collect())
    }

    async fn count_votes(&self) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM votes")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        count_from_db(count)
    }

    async fn upsert_voter(&self, login: &VoterLogin) -> Result<Voter, StoreError> {
        // The no-op DO UPDATE makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, VoterRow>(&format!(
            "INSERT INTO voters (id, name, email, identity_key, is_verified, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (identity_key) DO UPDATE SET identity_key = EXCLUDED.identity_key \
             RETURNING {VOTER_COLUMNS}"
        ))
        .bind(VoterId::new().as_uuid())
        .bind(&login.name)
        .bind(&login.email)
        .bind(&login.identity_key)
        .bind(login.verified_on_create)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.into())
    }

    async fn get_voter(&self, id: VoterId) -> Result<Option<Voter>, StoreError> {
        let row = sqlx::query_as::<_, VoterRow>(&format!(
            "SELECT {VOTER_COLUMNS} FROM voters WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Voter::from))
    }

    async fn get_voters(&self, ids: &HashSet<VoterId>) -> Result<Vec<Voter>, StoreError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, VoterRow>(&format!(
            "SELECT {VOTER_COLUMNS} FROM voters WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Voter::from).collect())
    }

    async fn list_voters(&self) -> Result<Vec<Voter>, StoreError> {
        let rows = sqlx::query_as::<_, VoterRow>(&format!(
            "SELECT {VOTER_COLUMNS} FROM voters ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Voter::from).collect())
    }

    async fn set_voter_verified(
        &self,
        id: VoterId,
        verified: bool,
    ) -> Result<Option<Voter>, StoreError> {
        let row = sqlx::query_as::<_, VoterRow>(&format!(
            "UPDATE voters SET is_verified = $2 WHERE id = $1 RETURNING {VOTER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(verified)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Voter::from))
    }
}
