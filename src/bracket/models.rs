use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::stages::{BracketSide, StageId};

/// Per-team standing, mutated only by result application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamRecord {
    pub wins: u32,
    pub losses: u32,
    pub points: i32,
    pub eliminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Created but missing at least one team slot
    Pending,
    /// Both slots filled, ready to be launched
    Scheduled,
    /// A live match is attached and running
    Active,
    /// Result recorded; immutable from here on
    Completed,
}

/// What a finished live match reports back to the bracket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub winner_id: String,
    pub loser_id: String,
    pub scores: HashMap<String, i32>,
    pub winner_name: Option<String>,
    pub loser_name: Option<String>,
}

/// History entry appended when a bracket match completes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub winner_id: String,
    pub loser_id: String,
    pub winner_name: String,
    pub loser_name: String,
    pub scores: HashMap<String, i32>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketMatch {
    pub id: String,
    pub stage_id: StageId,
    pub bracket: BracketSide,
    pub label: String,
    /// Slots fill in as upstream matches resolve
    pub teams: [Option<String>; 2],
    pub status: MatchStatus,
    pub winner_id: Option<String>,
    pub loser_id: Option<String>,
    pub moderator_id: Option<String>,
    /// Link to the in-progress live match once launched
    pub live_match_id: Option<String>,
    pub history: Vec<CompletionRecord>,
}

impl BracketMatch {
    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    pub fn has_both_teams(&self) -> bool {
        self.teams.iter().all(|slot| slot.is_some())
    }

    pub fn involves(&self, team_id: &str) -> bool {
        self.teams
            .iter()
            .any(|slot| slot.as_deref() == Some(team_id))
    }
}

/// A named round within a bracket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub label: String,
    pub bracket: BracketSide,
    pub order: usize,
    pub match_ids: Vec<String>,
    /// Set once the scheduler has populated this stage, even with zero
    /// matches. Guards against re-scheduling.
    pub scheduled: bool,
}

impl Stage {
    pub fn new(id: StageId) -> Self {
        Self {
            id,
            label: id.label().to_string(),
            bracket: id.bracket(),
            order: id.order(),
            match_ids: Vec::new(),
            scheduled: false,
        }
    }
}

/// Accumulated outcomes of one stage, feeding downstream scheduling
///
/// Byes land directly in `winners` without a backing match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTally {
    pub winners: Vec<String>,
    pub losers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentState {
    pub id: String,
    pub stages: HashMap<StageId, Stage>,
    pub matches: HashMap<String, BracketMatch>,
    pub records: HashMap<String, TeamRecord>,
    pub progress: HashMap<StageId, StageTally>,
    pub moderators: Vec<String>,
    /// Monotonic round-robin cursor over the moderator roster
    pub moderator_cursor: usize,
    pub status: TournamentStatus,
    pub champion_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TournamentState {
    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.get(&id)
    }

    pub fn tally(&self, id: StageId) -> Option<&StageTally> {
        self.progress.get(&id)
    }

    /// A stage is resolved once it has been scheduled and every match in it
    /// has completed. An empty scheduled stage is trivially resolved.
    pub fn stage_resolved(&self, id: StageId) -> bool {
        let Some(stage) = self.stages.get(&id) else {
            return false;
        };
        stage.scheduled
            && stage.match_ids.iter().all(|match_id| {
                self.matches
                    .get(match_id)
                    .map(BracketMatch::is_completed)
                    .unwrap_or(false)
            })
    }

    pub fn stages_ordered(&self) -> Vec<&Stage> {
        StageId::ALL
            .iter()
            .filter_map(|id| self.stages.get(id))
            .collect()
    }
}
