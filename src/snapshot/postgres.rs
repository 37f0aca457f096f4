use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument, warn};

use super::store::SnapshotStore;
use crate::livematch::{LiveMatch, LiveMatchStatus};
use crate::shared::AppError;

/// PostgreSQL implementation of SnapshotStore
///
/// Expects a table:
/// ```sql
/// CREATE TABLE match_snapshots (
///     id            TEXT PRIMARY KEY,
///     tournament_id TEXT NOT NULL,
///     status        TEXT NOT NULL,
///     state         JSONB NOT NULL,
///     updated_at    TIMESTAMPTZ NOT NULL
/// );
/// ```
pub struct PostgresSnapshotStore {
    pool: PgPool,
}

impl PostgresSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn status_tag(status: LiveMatchStatus) -> &'static str {
        match status {
            LiveMatchStatus::CoinToss => "coin-toss",
            LiveMatchStatus::InProgress => "in-progress",
            LiveMatchStatus::Paused => "paused",
            LiveMatchStatus::Completed => "completed",
        }
    }
}

#[async_trait]
impl SnapshotStore for PostgresSnapshotStore {
    #[instrument(skip(self, state))]
    async fn put(&self, match_ref_id: &str, state: &LiveMatch) -> Result<(), AppError> {
        let payload =
            serde_json::to_value(state).map_err(|e| AppError::StorageError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO match_snapshots (id, tournament_id, status, state, updated_at)
             VALUES ($1, $2, $3, $4, NOW())
             ON CONFLICT (id) DO UPDATE
             SET tournament_id = $2, status = $3, state = $4, updated_at = NOW()",
        )
        .bind(match_ref_id)
        .bind(&state.tournament_id)
        .bind(Self::status_tag(state.status))
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, match_ref_id = %match_ref_id, "Failed to store snapshot");
            AppError::StorageError(e.to_string())
        })?;

        debug!(match_ref_id = %match_ref_id, "Snapshot stored in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, match_ref_id: &str) -> Result<Option<LiveMatch>, AppError> {
        let row = sqlx::query("SELECT state FROM match_snapshots WHERE id = $1")
            .bind(match_ref_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, match_ref_id = %match_ref_id, "Failed to fetch snapshot");
                AppError::StorageError(e.to_string())
            })?;

        match row {
            Some(row) => {
                let payload: serde_json::Value = row.get("state");
                let state = serde_json::from_value(payload)
                    .map_err(|e| AppError::StorageError(e.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list_active(&self, tournament_id: &str) -> Result<Vec<LiveMatch>, AppError> {
        let rows = sqlx::query(
            "SELECT state FROM match_snapshots
             WHERE tournament_id = $1 AND status <> 'completed'",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, tournament_id = %tournament_id, "Failed to list snapshots");
            AppError::StorageError(e.to_string())
        })?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: serde_json::Value = row.get("state");
            let state = serde_json::from_value(payload)
                .map_err(|e| AppError::StorageError(e.to_string()))?;
            matches.push(state);
        }
        Ok(matches)
    }
}
