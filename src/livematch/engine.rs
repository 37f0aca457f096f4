use chrono::{Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{
    CoinFace, CoinToss, CoinTossDecision, CoinTossStatus, LiveMatch, LiveMatchStatus, MatchTimer,
    TimerKind, TimerStatus,
};
use super::timer::{TimerController, TimerExpired};
use crate::bracket::{BracketResultSink, MatchOutcome};
use crate::config::{EngineSettings, PRIMARY_QUESTION_POINTS, STEAL_QUESTION_POINTS};
use crate::event::{ChangeEvent, EventBus};
use crate::question::QuestionSupplier;
use crate::snapshot::SnapshotStore;
use crate::team::TeamDirectory;

/// Match-level state machine: coin toss, question turns, steals, timers,
/// finalization.
///
/// One `Arc<Mutex<LiveMatch>>` per in-progress match, so transitions on a
/// single match are serialized (including their persistence I/O) while
/// distinct matches run fully in parallel. Invalid transitions and unknown
/// match ids return `None`; that is normal control flow, not a fault.
///
/// Every mutation persists a snapshot before the change notification goes
/// out. Snapshot failures are logged and swallowed - the in-memory state
/// stays authoritative and a later write catches the store up.
pub struct LiveMatchEngine {
    settings: EngineSettings,
    matches: RwLock<HashMap<String, Arc<Mutex<LiveMatch>>>>,
    questions: Arc<dyn QuestionSupplier>,
    snapshots: Arc<dyn SnapshotStore>,
    bracket: Arc<dyn BracketResultSink>,
    team_directory: Arc<dyn TeamDirectory>,
    event_bus: EventBus,
    timers: TimerController,
    rng: StdMutex<StdRng>,
}

impl LiveMatchEngine {
    pub fn new(
        settings: EngineSettings,
        questions: Arc<dyn QuestionSupplier>,
        snapshots: Arc<dyn SnapshotStore>,
        bracket: Arc<dyn BracketResultSink>,
        team_directory: Arc<dyn TeamDirectory>,
        event_bus: EventBus,
    ) -> Arc<Self> {
        Self::with_rng(
            settings,
            questions,
            snapshots,
            bracket,
            team_directory,
            event_bus,
            StdRng::from_os_rng(),
        )
    }

    /// Seeded constructor for deterministic coin flips in tests
    pub fn with_rng(
        settings: EngineSettings,
        questions: Arc<dyn QuestionSupplier>,
        snapshots: Arc<dyn SnapshotStore>,
        bracket: Arc<dyn BracketResultSink>,
        team_directory: Arc<dyn TeamDirectory>,
        event_bus: EventBus,
        rng: StdRng,
    ) -> Arc<Self> {
        let (timers, expiry_rx) = TimerController::new();
        let engine = Arc::new(Self {
            settings,
            matches: RwLock::new(HashMap::new()),
            questions,
            snapshots,
            bracket,
            team_directory,
            event_bus,
            timers,
            rng: StdMutex::new(rng),
        });
        engine.clone().spawn_expiry_worker(expiry_rx);
        engine
    }

    fn spawn_expiry_worker(self: Arc<Self>, mut expiry_rx: mpsc::UnboundedReceiver<TimerExpired>) {
        tokio::spawn(async move {
            while let Some(expired) = expiry_rx.recv().await {
                self.handle_timer_expiry(expired).await;
            }
        });
    }

    /// Creates a live match for a bracket pairing: draws the question queue,
    /// zeroes scores, and parks the match at coin-toss/ready. The bracket
    /// match is linked immediately.
    #[instrument(skip(self))]
    pub async fn create_live_match(
        &self,
        team_a_id: &str,
        team_b_id: &str,
        moderator_id: Option<String>,
        tournament_match_id: &str,
        tournament_id: &str,
    ) -> LiveMatch {
        let question_count = self.settings.questions_per_team * 2;
        let question_queue = self.questions.draw(question_count, tournament_id).await;

        let id = Uuid::new_v4().to_string();
        let mut scores = HashMap::new();
        scores.insert(team_a_id.to_string(), 0);
        scores.insert(team_b_id.to_string(), 0);

        let now = Utc::now();
        let state = LiveMatch {
            id: id.clone(),
            tournament_id: tournament_id.to_string(),
            tournament_match_id: tournament_match_id.to_string(),
            moderator_id,
            teams: [team_a_id.to_string(), team_b_id.to_string()],
            scores,
            question_queue,
            question_index: 0,
            assigned_team_order: Vec::new(),
            active_team_id: None,
            awaiting_steal: false,
            status: LiveMatchStatus::CoinToss,
            timer: None,
            coin_toss: CoinToss::ready(),
            created_at: now,
            updated_at: now,
        };

        // Hold the fresh match's lock until the first snapshot lands, so no
        // other transition can slip in between creation and persistence.
        let entry = Arc::new(Mutex::new(state));
        let guard = entry.lock().await;
        self.matches.write().await.insert(id.clone(), entry.clone());

        self.bracket
            .attach_live_match(tournament_id, tournament_match_id, &id)
            .await;

        info!(
            match_id = %id,
            tournament_id = %tournament_id,
            questions = guard.question_queue.len(),
            "Live match created"
        );
        self.persist_and_emit(&guard).await;
        guard.clone()
    }

    /// Current snapshot of a match, or `None` once it has finalized or never
    /// existed.
    pub async fn join_match(&self, match_id: &str) -> Option<LiveMatch> {
        let entry = self.entry(match_id).await?;
        let state = entry.lock().await;
        Some(state.clone())
    }

    /// All in-memory matches for a tournament
    pub async fn active_matches(&self, tournament_id: &str) -> Vec<LiveMatch> {
        let index = self.matches.read().await;
        let mut snapshots = Vec::new();
        for entry in index.values() {
            let state = entry.lock().await;
            if state.tournament_id == tournament_id {
                snapshots.push(state.clone());
            }
        }
        snapshots
    }

    /// Resolves the coin toss. Only valid while the toss is `ready`.
    ///
    /// Heads means team A, tails team B. A `winner_override` naming one of
    /// the two teams forces the face consistent with that winner; any other
    /// override is ignored in favor of a random flip.
    #[instrument(skip(self))]
    pub async fn flip_coin(
        &self,
        match_id: &str,
        winner_override: Option<&str>,
    ) -> Option<LiveMatch> {
        let entry = self.entry(match_id).await?;
        let mut state = entry.lock().await;
        if state.coin_toss.status != CoinTossStatus::Ready {
            debug!(match_id = %match_id, "Coin already flipped; rejecting");
            return None;
        }

        let forced = winner_override.filter(|team| state.is_team(team));
        let (face, winner) = match forced {
            Some(team) if team == state.teams[0] => (CoinFace::Heads, state.teams[0].clone()),
            Some(_) => (CoinFace::Tails, state.teams[1].clone()),
            None => {
                let heads = self.rng.lock().unwrap().random_bool(0.5);
                if heads {
                    (CoinFace::Heads, state.teams[0].clone())
                } else {
                    (CoinFace::Tails, state.teams[1].clone())
                }
            }
        };

        state.coin_toss.status = CoinTossStatus::Flipped;
        state.coin_toss.result_face = Some(face);
        state.coin_toss.winner_id = Some(winner.clone());
        state.updated_at = Utc::now();

        info!(match_id = %match_id, winner_id = %winner, "Coin flipped");
        self.persist_and_emit(&state).await;
        Some(state.clone())
    }

    /// The toss winner picks who answers first. Builds the alternating
    /// question order, arms the first primary timer, and moves the match to
    /// in-progress.
    #[instrument(skip(self))]
    pub async fn decide_first(
        &self,
        match_id: &str,
        decider_id: &str,
        first_team_id: &str,
    ) -> Option<LiveMatch> {
        let entry = self.entry(match_id).await?;
        let mut state = entry.lock().await;
        if state.coin_toss.status != CoinTossStatus::Flipped {
            return None;
        }
        if state.coin_toss.winner_id.as_deref() != Some(decider_id) {
            debug!(match_id = %match_id, decider_id = %decider_id, "Decider is not the toss winner");
            return None;
        }
        if !state.is_team(first_team_id) {
            return None;
        }

        let second_team = state.opponent_of(first_team_id)?.to_string();
        state.assigned_team_order = build_question_order(
            first_team_id,
            &second_team,
            self.settings.questions_per_team,
            state.question_queue.len(),
        );

        state.coin_toss.status = CoinTossStatus::Decided;
        state.coin_toss.decision = Some(CoinTossDecision {
            decider_id: decider_id.to_string(),
            first_team_id: first_team_id.to_string(),
        });
        state.active_team_id = state.assigned_team_order.first().cloned();
        state.awaiting_steal = false;
        state.status = LiveMatchStatus::InProgress;
        self.start_timer(&mut state, TimerKind::Primary);
        state.updated_at = Utc::now();

        info!(match_id = %match_id, first_team_id = %first_team_id, "Match underway");
        self.persist_and_emit(&state).await;
        Some(state.clone())
    }

    /// Scores an answer from the acting team. During a steal window either
    /// team may submit (the stealer is the active team); otherwise only the
    /// active team is heard.
    #[instrument(skip(self, answer_value))]
    pub async fn submit_answer(
        &self,
        match_id: &str,
        team_id: &str,
        answer_value: &str,
    ) -> Option<LiveMatch> {
        let entry = self.entry(match_id).await?;
        let mut state = entry.lock().await;
        if state.status != LiveMatchStatus::InProgress {
            return None;
        }
        let permitted = if state.awaiting_steal {
            state.is_team(team_id)
        } else {
            state.active_team_id.as_deref() == Some(team_id)
        };
        if !permitted {
            debug!(match_id = %match_id, team_id = %team_id, "Answer from non-acting team rejected");
            return None;
        }

        let correct = state
            .current_question()
            .map(|q| q.is_correct(answer_value))
            .unwrap_or(false);
        debug!(match_id = %match_id, team_id = %team_id, correct = correct, "Answer submitted");

        self.resolve_answer(&mut state, correct).await;
        state.updated_at = Utc::now();
        self.persist_and_emit(&state).await;

        let snapshot = state.clone();
        drop(state);
        self.retire_if_completed(&snapshot).await;
        Some(snapshot)
    }

    /// Freezes the countdown and suspends play
    #[instrument(skip(self))]
    pub async fn pause_match(&self, match_id: &str) -> Option<LiveMatch> {
        let entry = self.entry(match_id).await?;
        let mut state = entry.lock().await;
        if state.status != LiveMatchStatus::InProgress {
            return None;
        }

        if let Some(timer) = state.timer.as_mut() {
            if timer.status == TimerStatus::Running {
                let remaining = timer
                    .deadline
                    .map(|d| (d - Utc::now()).num_milliseconds().max(0))
                    .unwrap_or(0);
                timer.remaining_ms = Some(remaining);
                timer.deadline = None;
                timer.status = TimerStatus::Paused;
            }
        }
        self.timers.cancel(match_id);
        state.status = LiveMatchStatus::Paused;
        state.updated_at = Utc::now();

        info!(match_id = %match_id, "Match paused");
        self.persist_and_emit(&state).await;
        Some(state.clone())
    }

    /// Restores the frozen countdown and resumes play
    #[instrument(skip(self))]
    pub async fn resume_match(&self, match_id: &str) -> Option<LiveMatch> {
        let entry = self.entry(match_id).await?;
        let mut state = entry.lock().await;
        if state.status != LiveMatchStatus::Paused {
            return None;
        }

        state.status = LiveMatchStatus::InProgress;
        if let Some(timer) = state.timer.as_mut() {
            if timer.status == TimerStatus::Paused {
                let remaining = timer.remaining_ms.take().unwrap_or(0);
                let deadline = Utc::now() + ChronoDuration::milliseconds(remaining);
                timer.deadline = Some(deadline);
                timer.status = TimerStatus::Running;
                timer.epoch += 1;
                self.timers.arm(match_id, timer.epoch, deadline);
            }
        }
        state.updated_at = Utc::now();

        info!(match_id = %match_id, "Match resumed");
        self.persist_and_emit(&state).await;
        Some(state.clone())
    }

    /// Returns the match to coin-toss/ready with zeroed scores. Valid from
    /// any non-terminal state; a tie at finalization lands here so the
    /// pairing can be replayed instead of discarded.
    #[instrument(skip(self))]
    pub async fn reset_match(&self, match_id: &str) -> Option<LiveMatch> {
        let entry = self.entry(match_id).await?;
        let mut state = entry.lock().await;
        self.reset_in_place(&mut state);
        state.updated_at = Utc::now();

        info!(match_id = %match_id, "Match reset to coin toss");
        self.persist_and_emit(&state).await;
        Some(state.clone())
    }

    /// Reinstates all non-completed matches of a tournament from the
    /// snapshot store. Running timers are re-armed from their stored
    /// deadlines; an already-elapsed deadline fires the expiry path
    /// immediately. Returns the number of matches restored.
    #[instrument(skip(self))]
    pub async fn recover_tournament(&self, tournament_id: &str) -> usize {
        let stored = match self.snapshots.list_active(tournament_id).await {
            Ok(stored) => stored,
            Err(error) => {
                warn!(tournament_id = %tournament_id, error = %error, "Snapshot recovery failed");
                return 0;
            }
        };

        let mut restored = 0;
        for state in stored {
            let match_id = state.id.clone();
            {
                let mut index = self.matches.write().await;
                if index.contains_key(&match_id) {
                    continue;
                }
                index.insert(match_id.clone(), Arc::new(Mutex::new(state.clone())));
            }

            if state.status == LiveMatchStatus::InProgress {
                if let Some(timer) = &state.timer {
                    if timer.status == TimerStatus::Running {
                        if let Some(deadline) = timer.deadline {
                            self.timers.arm(&match_id, timer.epoch, deadline);
                        }
                    }
                }
            }
            info!(match_id = %match_id, "Live match restored from snapshot");
            restored += 1;
        }
        restored
    }

    async fn entry(&self, match_id: &str) -> Option<Arc<Mutex<LiveMatch>>> {
        self.matches.read().await.get(match_id).cloned()
    }

    /// A countdown ran out. Stale expiries (superseded or paused timers, or
    /// a match no longer in progress) are dropped by epoch comparison; a
    /// live one is the acting team answering incorrectly.
    async fn handle_timer_expiry(&self, expired: TimerExpired) {
        let Some(entry) = self.entry(&expired.match_id).await else {
            return;
        };
        let mut state = entry.lock().await;

        let current_epoch = state
            .timer
            .as_ref()
            .filter(|t| t.status == TimerStatus::Running)
            .map(|t| t.epoch);
        if current_epoch != Some(expired.epoch) {
            debug!(match_id = %expired.match_id, epoch = expired.epoch, "Stale timer expiry ignored");
            return;
        }
        if state.status != LiveMatchStatus::InProgress {
            return;
        }

        info!(
            match_id = %expired.match_id,
            team_id = state.active_team_id.as_deref().unwrap_or("-"),
            "Timer expired; treating as incorrect answer"
        );
        self.resolve_answer(&mut state, false).await;
        state.updated_at = Utc::now();
        self.persist_and_emit(&state).await;

        let snapshot = state.clone();
        drop(state);
        self.retire_if_completed(&snapshot).await;
    }

    /// Shared outcome logic for explicit submissions and timer forfeits
    async fn resolve_answer(&self, state: &mut LiveMatch, correct: bool) {
        if state.awaiting_steal {
            if correct {
                if let Some(team) = state.active_team_id.clone() {
                    *state.scores.entry(team).or_insert(0) += STEAL_QUESTION_POINTS;
                }
            }
            // The steal window closes either way
            self.advance(state).await;
            return;
        }

        if correct {
            if let Some(team) = state.active_team_id.clone() {
                *state.scores.entry(team).or_insert(0) += PRIMARY_QUESTION_POINTS;
            }
            self.advance(state).await;
            return;
        }

        let opponent = state
            .active_team_id
            .as_deref()
            .and_then(|team| state.opponent_of(team))
            .map(str::to_string);
        match opponent {
            Some(opponent) => {
                state.active_team_id = Some(opponent);
                state.awaiting_steal = true;
                self.start_timer(state, TimerKind::Steal);
            }
            // No one to steal: burn the question and move on
            None => self.advance(state).await,
        }
    }

    async fn advance(&self, state: &mut LiveMatch) {
        state.question_index += 1;
        state.awaiting_steal = false;

        if state.question_index >= state.question_queue.len() {
            self.finalize(state).await;
            return;
        }

        state.active_team_id = state.assigned_team_order.get(state.question_index).cloned();
        self.start_timer(state, TimerKind::Primary);
    }

    /// The queue is exhausted. A strict winner reports into the bracket and
    /// the match goes terminal; a tie resets the match for a replay, since a
    /// tie is not a valid bracket outcome.
    async fn finalize(&self, state: &mut LiveMatch) {
        state.timer = None;
        self.timers.cancel(&state.id);

        let [team_a, team_b] = state.teams.clone();
        let score_a = state.score_of(&team_a);
        let score_b = state.score_of(&team_b);

        if score_a == score_b {
            info!(match_id = %state.id, score = score_a, "Match tied; resetting for replay");
            self.reset_in_place(state);
            return;
        }

        let (winner_id, loser_id) = if score_a > score_b {
            (team_a, team_b)
        } else {
            (team_b, team_a)
        };
        state.status = LiveMatchStatus::Completed;
        state.active_team_id = None;

        let names = self.team_directory.resolve_names(&state.teams).await;
        let outcome = MatchOutcome {
            winner_id: winner_id.clone(),
            loser_id: loser_id.clone(),
            scores: state.scores.clone(),
            winner_name: names.get(&winner_id).cloned(),
            loser_name: names.get(&loser_id).cloned(),
        };

        info!(
            match_id = %state.id,
            winner_id = %winner_id,
            loser_id = %loser_id,
            "Live match finalized"
        );
        self.bracket
            .record_result(&state.tournament_id, &state.tournament_match_id, outcome)
            .await;
        self.bracket
            .detach_live_match(&state.tournament_id, &state.tournament_match_id)
            .await;
    }

    fn reset_in_place(&self, state: &mut LiveMatch) {
        for team in state.teams.clone() {
            state.scores.insert(team, 0);
        }
        state.question_index = 0;
        state.assigned_team_order.clear();
        state.active_team_id = None;
        state.awaiting_steal = false;
        state.status = LiveMatchStatus::CoinToss;
        state.coin_toss = CoinToss::ready();
        state.timer = None;
        self.timers.cancel(&state.id);
    }

    /// Arms a fresh countdown, superseding whatever was pending
    fn start_timer(&self, state: &mut LiveMatch, kind: TimerKind) {
        let duration = self.settings.timer_duration(kind);
        let epoch = state.timer_epoch() + 1;
        let deadline = Utc::now() + ChronoDuration::milliseconds(duration.as_millis() as i64);

        state.timer = Some(MatchTimer {
            kind,
            status: TimerStatus::Running,
            deadline: Some(deadline),
            remaining_ms: None,
            duration_ms: duration.as_millis() as i64,
            epoch,
        });
        self.timers.arm(&state.id, epoch, deadline);
    }

    /// Snapshot first, notification second, so observers reloading from the
    /// store never see a state older than the event that pointed them at it.
    ///
    /// Callers invoke this while still holding the match's mutex: the write
    /// is part of the transition's critical section, so snapshots of one
    /// match can never land out of order.
    async fn persist_and_emit(&self, state: &LiveMatch) {
        if let Err(error) = self.snapshots.put(&state.id, state).await {
            warn!(
                match_id = %state.id,
                error = %error,
                "Snapshot write failed; in-memory state stays authoritative"
            );
        }
        self.event_bus.emit(ChangeEvent::MatchChanged {
            match_id: state.id.clone(),
            tournament_id: state.tournament_id.clone(),
            snapshot: Box::new(state.clone()),
        });
    }

    /// Terminal matches leave the in-memory index; their completed snapshot
    /// stays in the store.
    async fn retire_if_completed(&self, state: &LiveMatch) {
        if state.status != LiveMatchStatus::Completed {
            return;
        }
        self.matches.write().await.remove(&state.id);

        let winner_id = state
            .scores
            .iter()
            .max_by_key(|(_, score)| **score)
            .map(|(team, _)| team.clone());
        self.event_bus.emit(ChangeEvent::MatchCompleted {
            match_id: state.id.clone(),
            tournament_id: state.tournament_id.clone(),
            winner_id,
        });
        debug!(match_id = %state.id, "Live match retired from index");
    }
}

/// Alternates question slots between the two teams starting with `first`,
/// capping each team at `per_team` slots; once a team hits its cap the
/// remaining slots all go to the other team.
fn build_question_order(
    first: &str,
    second: &str,
    per_team: usize,
    total_slots: usize,
) -> Vec<String> {
    let teams = [first, second];
    let mut counts = [0usize; 2];
    let mut order = Vec::with_capacity(total_slots);

    for slot in 0..total_slots {
        let preferred = slot % 2;
        let assigned = if counts[preferred] < per_team {
            preferred
        } else {
            1 - preferred
        };
        order.push(teams[assigned].to_string());
        counts[assigned] += 1;
    }
    order
}
