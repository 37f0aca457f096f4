use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::{
    BracketMatch, CompletionRecord, MatchOutcome, MatchStatus, Stage, StageTally, TeamRecord,
    TournamentState, TournamentStatus,
};
use super::stages::StageId;

// Pure transition functions over TournamentState. Each takes the state by
// value and returns the updated state, so callers never observe a partially
// applied transition.

/// Builds the initial bracket: shuffled roster paired into winners-r1,
/// moderators assigned round-robin, all eleven stages created.
///
/// An empty roster yields an empty bracket, not an error.
pub fn initialize_tournament(
    tournament_id: String,
    team_ids: &[String],
    moderators: &[String],
    rng: &mut impl Rng,
) -> TournamentState {
    let mut state = TournamentState {
        id: tournament_id,
        stages: StageId::ALL
            .iter()
            .map(|&id| (id, Stage::new(id)))
            .collect(),
        matches: Default::default(),
        records: team_ids
            .iter()
            .map(|id| (id.clone(), TeamRecord::default()))
            .collect(),
        progress: StageId::ALL
            .iter()
            .map(|&id| (id, StageTally::default()))
            .collect(),
        moderators: moderators.to_vec(),
        moderator_cursor: 0,
        status: TournamentStatus::Pending,
        champion_id: None,
        started_at: None,
        created_at: Utc::now(),
    };

    let mut seeding: Vec<String> = team_ids.to_vec();
    seeding.shuffle(rng);

    schedule_pairs(&mut state, StageId::WinnersR1, seeding);

    info!(
        tournament_id = %state.id,
        teams = team_ids.len(),
        matches = state.matches.len(),
        "Tournament initialized"
    );

    state
}

/// Applies a completed match result and schedules every downstream stage
/// whose prerequisites are newly satisfied.
///
/// Idempotent: unknown match ids and already-completed matches return the
/// state unchanged.
pub fn record_match_result(
    mut state: TournamentState,
    match_id: &str,
    outcome: MatchOutcome,
) -> TournamentState {
    let Some(bracket_match) = state.matches.get_mut(match_id) else {
        debug!(match_id = %match_id, "Result for unknown match ignored");
        return state;
    };
    if bracket_match.is_completed() {
        debug!(match_id = %match_id, "Result for completed match ignored");
        return state;
    }

    let stage_id = bracket_match.stage_id;
    bracket_match.status = MatchStatus::Completed;
    bracket_match.winner_id = Some(outcome.winner_id.clone());
    bracket_match.loser_id = Some(outcome.loser_id.clone());
    bracket_match.live_match_id = None;
    bracket_match.history.push(CompletionRecord {
        winner_id: outcome.winner_id.clone(),
        loser_id: outcome.loser_id.clone(),
        winner_name: outcome
            .winner_name
            .clone()
            .unwrap_or_else(|| outcome.winner_id.clone()),
        loser_name: outcome
            .loser_name
            .clone()
            .unwrap_or_else(|| outcome.loser_id.clone()),
        scores: outcome.scores.clone(),
        completed_at: Utc::now(),
    });

    apply_team_records(&mut state, &outcome);

    let tally = state.progress.entry(stage_id).or_default();
    tally.winners.push(outcome.winner_id.clone());
    tally.losers.push(outcome.loser_id.clone());

    // Playoff winners drop straight into the open slot of their mini-stage
    // final.
    match stage_id {
        StageId::WinnersR3Playoff => {
            fill_stage_open_slot(&mut state, StageId::WinnersR3Final, &outcome.winner_id);
        }
        StageId::LosersR4Playoff => {
            fill_stage_open_slot(&mut state, StageId::LosersR4Final, &outcome.winner_id);
        }
        StageId::Final1 => resolve_grand_final(&mut state, match_id, &outcome),
        StageId::Final2 => complete_tournament(&mut state, &outcome.winner_id),
        _ => {}
    }

    schedule_ready_stages(&mut state);
    state
}

/// Fills open team slots on a not-yet-completed match. Slots given as `None`
/// keep their current occupant. Both slots filled promotes pending →
/// scheduled.
pub fn update_match_teams(
    mut state: TournamentState,
    match_id: &str,
    teams: [Option<String>; 2],
) -> TournamentState {
    let Some(bracket_match) = state.matches.get_mut(match_id) else {
        return state;
    };
    if bracket_match.is_completed() {
        debug!(match_id = %match_id, "Refusing to rewrite slots on completed match");
        return state;
    }

    for (slot, team) in bracket_match.teams.iter_mut().zip(teams) {
        if let Some(team) = team {
            *slot = Some(team);
        }
    }
    if bracket_match.status == MatchStatus::Pending && bracket_match.has_both_teams() {
        bracket_match.status = MatchStatus::Scheduled;
    }
    state
}

/// Links a live match to a bracket match. First attachment promotes the
/// tournament to active and stamps its start time.
pub fn attach_live_match(
    mut state: TournamentState,
    match_id: &str,
    live_match_id: &str,
) -> TournamentState {
    let Some(bracket_match) = state.matches.get_mut(match_id) else {
        return state;
    };
    if bracket_match.is_completed() {
        return state;
    }

    bracket_match.live_match_id = Some(live_match_id.to_string());
    bracket_match.status = MatchStatus::Active;

    if state.status == TournamentStatus::Pending {
        state.status = TournamentStatus::Active;
    }
    if state.started_at.is_none() {
        state.started_at = Some(Utc::now());
    }
    state
}

/// Unlinks a live match. A still-running bracket match drops back to
/// scheduled; a completed one only loses the link.
pub fn detach_live_match(mut state: TournamentState, match_id: &str) -> TournamentState {
    let Some(bracket_match) = state.matches.get_mut(match_id) else {
        return state;
    };

    bracket_match.live_match_id = None;
    if bracket_match.status == MatchStatus::Active {
        bracket_match.status = MatchStatus::Scheduled;
    }
    state
}

fn apply_team_records(state: &mut TournamentState, outcome: &MatchOutcome) {
    let winner_points = outcome.scores.get(&outcome.winner_id).copied().unwrap_or(0);
    let record = state.records.entry(outcome.winner_id.clone()).or_default();
    record.wins += 1;
    record.points += winner_points;

    let loser_points = outcome.scores.get(&outcome.loser_id).copied().unwrap_or(0);
    let record = state.records.entry(outcome.loser_id.clone()).or_default();
    record.losses += 1;
    record.points += loser_points;
    if record.losses >= 2 {
        record.eliminated = true;
    }
}

fn resolve_grand_final(state: &mut TournamentState, match_id: &str, outcome: &MatchOutcome) {
    // Slot 1 of final-1 holds the losers-bracket champion by construction.
    let losers_champion = state
        .matches
        .get(match_id)
        .and_then(|m| m.teams[1].clone());

    if losers_champion.as_deref() == Some(outcome.winner_id.as_str()) {
        // Bracket reset: the winners champion picked up their first loss, so
        // both teams play once more.
        let teams = state
            .matches
            .get(match_id)
            .map(|m| m.teams.clone())
            .unwrap_or_default();
        create_match(state, StageId::Final2, teams);
        if let Some(stage) = state.stages.get_mut(&StageId::Final2) {
            stage.scheduled = true;
        }
        info!(tournament_id = %state.id, "Bracket reset: final-2 scheduled");
    } else {
        complete_tournament(state, &outcome.winner_id);
    }
}

fn complete_tournament(state: &mut TournamentState, champion_id: &str) {
    state.status = TournamentStatus::Completed;
    state.champion_id = Some(champion_id.to_string());
    info!(
        tournament_id = %state.id,
        champion_id = %champion_id,
        "Tournament completed"
    );
}

/// Schedules every unscheduled stage whose feeder stages have resolved.
/// Runs in topology order so a bye-resolved stage can unlock its successor
/// within the same pass. Idempotent via the per-stage scheduled flag.
fn schedule_ready_stages(state: &mut TournamentState) {
    if !state.stage_resolved(StageId::WinnersR1) {
        return;
    }

    if !stage_scheduled(state, StageId::LosersR1) {
        let losers = tally_losers(state, StageId::WinnersR1);
        schedule_pairs(state, StageId::LosersR1, losers);
    }
    if !stage_scheduled(state, StageId::WinnersR2) {
        let winners = tally_winners(state, StageId::WinnersR1);
        schedule_pairs(state, StageId::WinnersR2, winners);
    }

    if !stage_scheduled(state, StageId::LosersR2)
        && state.stage_resolved(StageId::LosersR1)
        && state.stage_resolved(StageId::WinnersR2)
    {
        let candidates = interleave(
            tally_winners(state, StageId::LosersR1),
            tally_losers(state, StageId::WinnersR2),
        );
        schedule_pairs(state, StageId::LosersR2, candidates);
    }

    if !stage_scheduled(state, StageId::WinnersR3Playoff)
        && state.stage_resolved(StageId::WinnersR2)
    {
        let candidates = seed_by_points(state, tally_winners(state, StageId::WinnersR2));
        schedule_mini_stage(
            state,
            StageId::WinnersR3Playoff,
            StageId::WinnersR3Final,
            candidates,
        );
    }

    if !stage_scheduled(state, StageId::LosersR3)
        && state.stage_resolved(StageId::LosersR2)
        && state.stage_resolved(StageId::WinnersR3Playoff)
    {
        let mut candidates = tally_winners(state, StageId::LosersR2);
        candidates.extend(tally_losers(state, StageId::WinnersR3Playoff));
        schedule_pairs(state, StageId::LosersR3, candidates);
    }

    if !stage_scheduled(state, StageId::LosersR4Playoff)
        && state.stage_resolved(StageId::LosersR3)
        && state.stage_resolved(StageId::WinnersR3Final)
    {
        let mut candidates = tally_winners(state, StageId::LosersR3);
        candidates.extend(tally_losers(state, StageId::WinnersR3Final));
        let candidates = seed_by_points(state, candidates);
        schedule_mini_stage(
            state,
            StageId::LosersR4Playoff,
            StageId::LosersR4Final,
            candidates,
        );
    }

    if !stage_scheduled(state, StageId::Final1)
        && state.stage_resolved(StageId::WinnersR3Final)
        && state.stage_resolved(StageId::LosersR4Final)
    {
        let winners_champion = tally_winners(state, StageId::WinnersR3Final).into_iter().next();
        let losers_champion = tally_winners(state, StageId::LosersR4Final).into_iter().next();
        match (winners_champion, losers_champion) {
            (Some(w), Some(l)) => {
                create_match(state, StageId::Final1, [Some(w), Some(l)]);
            }
            (Some(only), None) | (None, Some(only)) => {
                // Degenerate bracket with a single survivor: champion outright.
                complete_tournament(state, &only);
            }
            (None, None) => {}
        }
        if let Some(stage) = state.stages.get_mut(&StageId::Final1) {
            stage.scheduled = true;
        }
    }
}

fn stage_scheduled(state: &TournamentState, id: StageId) -> bool {
    state.stages.get(&id).map(|s| s.scheduled).unwrap_or(true)
}

fn tally_winners(state: &TournamentState, id: StageId) -> Vec<String> {
    state
        .progress
        .get(&id)
        .map(|t| t.winners.clone())
        .unwrap_or_default()
}

fn tally_losers(state: &TournamentState, id: StageId) -> Vec<String> {
    state
        .progress
        .get(&id)
        .map(|t| t.losers.clone())
        .unwrap_or_default()
}

/// Pairs candidates in order into matches for a stage. An odd leftover
/// candidate byes straight into the stage tally as a winner.
fn schedule_pairs(state: &mut TournamentState, stage_id: StageId, candidates: Vec<String>) {
    let mut chunks = candidates.chunks_exact(2);
    for pair in chunks.by_ref() {
        create_match(
            state,
            stage_id,
            [Some(pair[0].clone()), Some(pair[1].clone())],
        );
    }
    if let Some(bye) = chunks.remainder().first() {
        debug!(stage = %stage_id, team_id = %bye, "Unpaired candidate byes through stage");
        state
            .progress
            .entry(stage_id)
            .or_default()
            .winners
            .push(bye.clone());
    }
    if let Some(stage) = state.stages.get_mut(&stage_id) {
        stage.scheduled = true;
    }
}

/// Schedules a seeded playoff/final pair of stages. The top seed byes into
/// the final; the next two candidates contest the playoff for the other
/// slot. With two candidates the final is played directly; a sole candidate
/// wins the mini-stage outright.
fn schedule_mini_stage(
    state: &mut TournamentState,
    playoff_id: StageId,
    final_id: StageId,
    seeded: Vec<String>,
) {
    match seeded.len() {
        0 => {}
        1 => {
            state
                .progress
                .entry(final_id)
                .or_default()
                .winners
                .push(seeded[0].clone());
        }
        2 => {
            create_match(
                state,
                final_id,
                [Some(seeded[0].clone()), Some(seeded[1].clone())],
            );
        }
        _ => {
            create_match(
                state,
                playoff_id,
                [Some(seeded[1].clone()), Some(seeded[2].clone())],
            );
            create_match(state, final_id, [Some(seeded[0].clone()), None]);
        }
    }
    for id in [playoff_id, final_id] {
        if let Some(stage) = state.stages.get_mut(&id) {
            stage.scheduled = true;
        }
    }
}

/// Orders candidates by descending accumulated points, ties broken by id so
/// seeding is deterministic.
fn seed_by_points(state: &TournamentState, mut candidates: Vec<String>) -> Vec<String> {
    candidates.sort_by(|a, b| {
        let pa = state.records.get(a).map(|r| r.points).unwrap_or(0);
        let pb = state.records.get(b).map(|r| r.points).unwrap_or(0);
        pb.cmp(&pa).then_with(|| a.cmp(b))
    });
    candidates
}

fn fill_stage_open_slot(state: &mut TournamentState, stage_id: StageId, team_id: &str) {
    let match_ids: Vec<String> = state
        .stages
        .get(&stage_id)
        .map(|s| s.match_ids.clone())
        .unwrap_or_default();

    for match_id in match_ids {
        if update_open_slot(state, &match_id, team_id) {
            return;
        }
    }
    warn!(stage = %stage_id, team_id = %team_id, "No open slot to fill");
}

fn update_open_slot(state: &mut TournamentState, match_id: &str, team_id: &str) -> bool {
    let Some(bracket_match) = state.matches.get_mut(match_id) else {
        return false;
    };
    if bracket_match.is_completed() {
        return false;
    }
    for slot in bracket_match.teams.iter_mut() {
        if slot.is_none() {
            *slot = Some(team_id.to_string());
            if bracket_match.status == MatchStatus::Pending && bracket_match.has_both_teams() {
                bracket_match.status = MatchStatus::Scheduled;
            }
            return true;
        }
    }
    false
}

fn create_match(
    state: &mut TournamentState,
    stage_id: StageId,
    teams: [Option<String>; 2],
) -> String {
    let match_id = Uuid::new_v4().to_string();
    let moderator_id = next_moderator(state);

    let sequence = state
        .stages
        .get(&stage_id)
        .map(|s| s.match_ids.len() + 1)
        .unwrap_or(1);
    let label = match stage_id {
        StageId::WinnersR1 | StageId::WinnersR2 | StageId::LosersR1 | StageId::LosersR2
        | StageId::LosersR3 => format!("{} Match {}", stage_id.label(), sequence),
        _ => stage_id.label().to_string(),
    };

    let status = if teams.iter().all(|slot| slot.is_some()) {
        MatchStatus::Scheduled
    } else {
        MatchStatus::Pending
    };

    let bracket_match = BracketMatch {
        id: match_id.clone(),
        stage_id,
        bracket: stage_id.bracket(),
        label,
        teams,
        status,
        winner_id: None,
        loser_id: None,
        moderator_id,
        live_match_id: None,
        history: Vec::new(),
    };

    debug!(
        match_id = %match_id,
        stage = %stage_id,
        "Bracket match created"
    );

    state.matches.insert(match_id.clone(), bracket_match);
    if let Some(stage) = state.stages.get_mut(&stage_id) {
        stage.match_ids.push(match_id.clone());
    }
    match_id
}

fn next_moderator(state: &mut TournamentState) -> Option<String> {
    if state.moderators.is_empty() {
        return None;
    }
    let moderator = state.moderators[state.moderator_cursor % state.moderators.len()].clone();
    state.moderator_cursor += 1;
    Some(moderator)
}

/// Interleaves two lists so each element of `left` is paired against the
/// element of `right` at the same position.
fn interleave(left: Vec<String>, right: Vec<String>) -> Vec<String> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut right_iter = right.into_iter();
    for item in left {
        merged.push(item);
        if let Some(other) = right_iter.next() {
            merged.push(other);
        }
    }
    merged.extend(right_iter);
    merged
}
