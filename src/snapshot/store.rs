use async_trait::async_trait;

use crate::livematch::LiveMatch;
use crate::shared::AppError;

/// Persists full live-match states for crash recovery and observation
///
/// The engines treat writes as fire-and-forget: a failed put is logged and
/// in-memory state stays authoritative, so implementations should not assume
/// every transition reaches them.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Stores (or replaces) the snapshot for a match
    async fn put(&self, match_ref_id: &str, state: &LiveMatch) -> Result<(), AppError>;

    /// Fetches a snapshot by match reference id
    async fn get(&self, match_ref_id: &str) -> Result<Option<LiveMatch>, AppError>;

    /// Lists all snapshots for a tournament that are not yet completed
    async fn list_active(&self, tournament_id: &str) -> Result<Vec<LiveMatch>, AppError>;
}
