use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Lookup from team id to display name
///
/// The engines use ids everywhere; names are only resolved at finalization so
/// completion records read well. A missing name is never an error - callers
/// fall back to the id.
#[async_trait]
pub trait TeamDirectory: Send + Sync {
    /// Resolve display names for the given team ids. Ids with no known name
    /// are simply absent from the returned map.
    async fn resolve_names(&self, team_ids: &[String]) -> HashMap<String, String>;
}

/// In-memory implementation of TeamDirectory
/// Uses RwLock for concurrent access with read optimization
pub struct InMemoryTeamDirectory {
    names: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryTeamDirectory {
    pub fn new() -> Self {
        Self {
            names: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register_team(&self, team_id: String, name: String) {
        let mut names = self.names.write().await;
        names.insert(team_id, name);
    }
}

impl Default for InMemoryTeamDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TeamDirectory for InMemoryTeamDirectory {
    async fn resolve_names(&self, team_ids: &[String]) -> HashMap<String, String> {
        let names = self.names.read().await;
        let resolved: HashMap<String, String> = team_ids
            .iter()
            .filter_map(|id| names.get(id).map(|name| (id.clone(), name.clone())))
            .collect();

        debug!(
            requested = team_ids.len(),
            resolved = resolved.len(),
            "Team name lookup"
        );

        resolved
    }
}
