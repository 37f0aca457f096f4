use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::engine;
use super::models::{BracketMatch, MatchOutcome, Stage, TournamentState, TournamentStatus};
use super::stages::StageId;
use crate::event::{ChangeEvent, EventBus};

/// How a finished live match reports back into the bracket
///
/// The live engine only ever needs these two calls, so it depends on this
/// trait rather than on the full service (and tests can stub it out).
#[async_trait]
pub trait BracketResultSink: Send + Sync {
    async fn record_result(&self, tournament_id: &str, match_id: &str, outcome: MatchOutcome);
    async fn attach_live_match(&self, tournament_id: &str, match_id: &str, live_match_id: &str);
    async fn detach_live_match(&self, tournament_id: &str, match_id: &str);
}

/// Tournament-level scheduler
///
/// Holds one `TournamentState` per tournament behind a single lock; every
/// mutation swaps the state through a pure transition function, so a reader
/// only ever sees a fully consistent bracket.
pub struct BracketService {
    tournaments: RwLock<HashMap<String, TournamentState>>,
    event_bus: EventBus,
    rng: StdMutex<StdRng>,
}

impl BracketService {
    pub fn new(event_bus: EventBus) -> Self {
        Self::with_rng(event_bus, StdRng::from_os_rng())
    }

    /// Seeded constructor for deterministic bracket seeding in tests
    pub fn with_rng(event_bus: EventBus, rng: StdRng) -> Self {
        Self {
            tournaments: RwLock::new(HashMap::new()),
            event_bus,
            rng: StdMutex::new(rng),
        }
    }

    /// Creates a tournament from the team and moderator rosters and builds
    /// the winners-r1 schedule.
    #[instrument(skip(self, team_ids, moderators))]
    pub async fn create_tournament(
        &self,
        team_ids: &[String],
        moderators: &[String],
    ) -> TournamentState {
        let tournament_id = Uuid::new_v4().to_string();
        let state = {
            let mut rng = self.rng.lock().unwrap();
            engine::initialize_tournament(tournament_id.clone(), team_ids, moderators, &mut *rng)
        };

        self.tournaments
            .write()
            .await
            .insert(tournament_id.clone(), state.clone());

        info!(tournament_id = %tournament_id, teams = team_ids.len(), "Tournament created");
        self.event_bus
            .emit(ChangeEvent::TournamentChanged { tournament_id });
        state
    }

    pub async fn get_tournament(&self, tournament_id: &str) -> Option<TournamentState> {
        self.tournaments.read().await.get(tournament_id).cloned()
    }

    /// Applies a match result. Returns the post-transition state, or `None`
    /// for an unknown tournament. Unknown or already-completed matches leave
    /// the state unchanged (idempotent under redelivery).
    #[instrument(skip(self, outcome))]
    pub async fn record_match_result(
        &self,
        tournament_id: &str,
        match_id: &str,
        outcome: MatchOutcome,
    ) -> Option<TournamentState> {
        let updated = self
            .apply(tournament_id, |state| {
                engine::record_match_result(state, match_id, outcome)
            })
            .await?;

        if updated.status == TournamentStatus::Completed {
            if let Some(champion_id) = updated.champion_id.clone() {
                self.event_bus.emit(ChangeEvent::TournamentCompleted {
                    tournament_id: tournament_id.to_string(),
                    champion_id,
                });
            }
        }
        Some(updated)
    }

    pub async fn update_match_teams(
        &self,
        tournament_id: &str,
        match_id: &str,
        teams: [Option<String>; 2],
    ) -> Option<TournamentState> {
        self.apply(tournament_id, |state| {
            engine::update_match_teams(state, match_id, teams)
        })
        .await
    }

    pub async fn list_stages(&self, tournament_id: &str) -> Option<Vec<Stage>> {
        let tournaments = self.tournaments.read().await;
        let state = tournaments.get(tournament_id)?;
        Some(state.stages_ordered().into_iter().cloned().collect())
    }

    pub async fn list_matches_for_stage(
        &self,
        tournament_id: &str,
        stage_id: StageId,
    ) -> Vec<BracketMatch> {
        let tournaments = self.tournaments.read().await;
        let Some(state) = tournaments.get(tournament_id) else {
            return Vec::new();
        };
        state
            .stage(stage_id)
            .map(|stage| {
                stage
                    .match_ids
                    .iter()
                    .filter_map(|id| state.matches.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Finds the first not-yet-completed bracket match pairing the two teams.
    pub async fn find_match_for_teams(
        &self,
        tournament_id: &str,
        team_a: &str,
        team_b: &str,
    ) -> Option<BracketMatch> {
        let tournaments = self.tournaments.read().await;
        let state = tournaments.get(tournament_id)?;
        StageId::ALL.iter().find_map(|stage_id| {
            state.stage(*stage_id).and_then(|stage| {
                stage.match_ids.iter().find_map(|id| {
                    let m = state.matches.get(id)?;
                    (!m.is_completed() && m.involves(team_a) && m.involves(team_b))
                        .then(|| m.clone())
                })
            })
        })
    }

    /// Swaps the tournament state through a transition function and emits a
    /// change notification. Single writer per tournament: the map's write
    /// lock is held across the whole read-transform-store.
    async fn apply<F>(&self, tournament_id: &str, transition: F) -> Option<TournamentState>
    where
        F: FnOnce(TournamentState) -> TournamentState,
    {
        let mut tournaments = self.tournaments.write().await;
        let state = tournaments.remove(tournament_id)?;
        let updated = transition(state);
        tournaments.insert(tournament_id.to_string(), updated.clone());
        drop(tournaments);

        debug!(tournament_id = %tournament_id, "Tournament state transitioned");
        self.event_bus.emit(ChangeEvent::TournamentChanged {
            tournament_id: tournament_id.to_string(),
        });
        Some(updated)
    }
}

#[async_trait]
impl BracketResultSink for BracketService {
    async fn record_result(&self, tournament_id: &str, match_id: &str, outcome: MatchOutcome) {
        self.record_match_result(tournament_id, match_id, outcome)
            .await;
    }

    async fn attach_live_match(&self, tournament_id: &str, match_id: &str, live_match_id: &str) {
        self.apply(tournament_id, |state| {
            engine::attach_live_match(state, match_id, live_match_id)
        })
        .await;
    }

    async fn detach_live_match(&self, tournament_id: &str, match_id: &str) {
        self.apply(tournament_id, |state| {
            engine::detach_live_match(state, match_id)
        })
        .await;
    }
}
