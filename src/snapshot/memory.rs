use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use super::store::SnapshotStore;
use crate::livematch::{LiveMatch, LiveMatchStatus};
use crate::shared::AppError;

/// In-memory implementation of SnapshotStore for development and testing
///
/// Data is lost when the process exits, so this gives no real crash
/// recovery; it exists so the engines can run without a database.
pub struct InMemorySnapshotStore {
    snapshots: Mutex<HashMap<String, LiveMatch>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn put(&self, match_ref_id: &str, state: &LiveMatch) -> Result<(), AppError> {
        let mut snapshots = self.snapshots.lock().unwrap();
        snapshots.insert(match_ref_id.to_string(), state.clone());
        debug!(match_ref_id = %match_ref_id, "Snapshot stored in memory");
        Ok(())
    }

    async fn get(&self, match_ref_id: &str) -> Result<Option<LiveMatch>, AppError> {
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots.get(match_ref_id).cloned())
    }

    async fn list_active(&self, tournament_id: &str) -> Result<Vec<LiveMatch>, AppError> {
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .filter(|m| m.status != LiveMatchStatus::Completed)
            .cloned()
            .collect())
    }
}
