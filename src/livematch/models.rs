use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::question::DrawnQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiveMatchStatus {
    CoinToss,
    InProgress,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinTossStatus {
    Ready,
    Flipped,
    Decided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinFace {
    Heads,
    Tails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinTossDecision {
    pub decider_id: String,
    pub first_team_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinToss {
    pub status: CoinTossStatus,
    pub winner_id: Option<String>,
    pub decision: Option<CoinTossDecision>,
    pub result_face: Option<CoinFace>,
}

impl CoinToss {
    pub fn ready() -> Self {
        Self {
            status: CoinTossStatus::Ready,
            winner_id: None,
            decision: None,
            result_face: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    Primary,
    Steal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Running,
    Paused,
}

/// The countdown attached to a match
///
/// Running timers carry an absolute deadline so a restarted process can
/// recompute the remaining time; paused timers freeze the remainder instead.
/// The epoch is bumped on every (re)start and lets the engine drop expiry
/// callbacks from superseded timers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchTimer {
    pub kind: TimerKind,
    pub status: TimerStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub remaining_ms: Option<i64>,
    pub duration_ms: i64,
    pub epoch: u64,
}

/// Full state of one live match; this is exactly what gets snapshotted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveMatch {
    pub id: String,
    pub tournament_id: String,
    pub tournament_match_id: String,
    pub moderator_id: Option<String>,
    pub teams: [String; 2],
    pub scores: HashMap<String, i32>,
    pub question_queue: Vec<DrawnQuestion>,
    pub question_index: usize,
    /// Which team answers each question slot; built at decide-first time
    pub assigned_team_order: Vec<String>,
    pub active_team_id: Option<String>,
    pub awaiting_steal: bool,
    pub status: LiveMatchStatus,
    pub timer: Option<MatchTimer>,
    pub coin_toss: CoinToss,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LiveMatch {
    pub fn is_team(&self, team_id: &str) -> bool {
        self.teams.iter().any(|t| t == team_id)
    }

    pub fn opponent_of(&self, team_id: &str) -> Option<&str> {
        if !self.is_team(team_id) {
            return None;
        }
        self.teams
            .iter()
            .find(|t| t.as_str() != team_id)
            .map(|t| t.as_str())
    }

    pub fn current_question(&self) -> Option<&DrawnQuestion> {
        self.question_queue.get(self.question_index)
    }

    pub fn score_of(&self, team_id: &str) -> i32 {
        self.scores.get(team_id).copied().unwrap_or(0)
    }

    /// Current timer epoch; zero before the first timer is armed
    pub fn timer_epoch(&self) -> u64 {
        self.timer.as_ref().map(|t| t.epoch).unwrap_or(0)
    }
}
