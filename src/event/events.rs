use serde::{Deserialize, Serialize};

use crate::livematch::LiveMatch;

/// Change notifications emitted by the engines
///
/// Events represent facts about things that have already happened. They are
/// best-effort: the engines never wait on delivery and nothing in the core
/// depends on an event being observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ChangeEvent {
    /// A live match mutated; the payload is the post-transition snapshot
    MatchChanged {
        match_id: String,
        tournament_id: String,
        snapshot: Box<LiveMatch>,
    },

    /// A live match reached a terminal state and left the in-memory index
    MatchCompleted {
        match_id: String,
        tournament_id: String,
        winner_id: Option<String>,
    },

    /// Bracket state changed (schedule, records, progress, or status)
    TournamentChanged { tournament_id: String },

    /// A champion was decided
    TournamentCompleted {
        tournament_id: String,
        champion_id: String,
    },
}

impl ChangeEvent {
    pub fn tournament_id(&self) -> &str {
        match self {
            ChangeEvent::MatchChanged { tournament_id, .. } => tournament_id,
            ChangeEvent::MatchCompleted { tournament_id, .. } => tournament_id,
            ChangeEvent::TournamentChanged { tournament_id } => tournament_id,
            ChangeEvent::TournamentCompleted { tournament_id, .. } => tournament_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            ChangeEvent::MatchChanged { .. } => "match_changed",
            ChangeEvent::MatchCompleted { .. } => "match_completed",
            ChangeEvent::TournamentChanged { .. } => "tournament_changed",
            ChangeEvent::TournamentCompleted { .. } => "tournament_completed",
        }
    }
}
