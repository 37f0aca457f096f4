// End-to-end bracket runs: live matches feeding the double-elimination
// scheduler until a champion is crowned.

mod utils;

use quizclash::bracket::{BracketMatch, MatchStatus, StageId, TournamentStatus};
use quizclash::config::EngineSettings;
use quizclash::livematch::LiveMatchStatus;
use utils::{run_pairing, team_ids, test_app, TestApp};

fn quick_settings() -> EngineSettings {
    EngineSettings {
        questions_per_team: 1,
        ..EngineSettings::default()
    }
}

async fn next_scheduled(app: &TestApp, tournament_id: &str) -> Option<BracketMatch> {
    let state = app.bracket.get_tournament(tournament_id).await?;
    let mut candidates: Vec<&BracketMatch> = state
        .matches
        .values()
        .filter(|m| m.status == MatchStatus::Scheduled && m.has_both_teams())
        .collect();
    candidates.sort_by_key(|m| m.id.clone());
    candidates.first().map(|m| (*m).clone())
}

#[tokio::test]
async fn twelve_team_tournament_runs_to_a_champion() {
    let app = test_app(quick_settings(), 5);
    let created = app
        .bracket
        .create_tournament(&team_ids(12), &["mod-a".to_string(), "mod-b".to_string()])
        .await;
    let tournament_id = created.id.clone();

    let round_one = app
        .bracket
        .list_matches_for_stage(&tournament_id, StageId::WinnersR1)
        .await;
    assert_eq!(round_one.len(), 6);

    let mut played = 0;
    while let Some(pairing) = next_scheduled(&app, &tournament_id).await {
        let a = pairing.teams[0].clone().unwrap();
        let b = pairing.teams[1].clone().unwrap();
        let winner = if a < b { a } else { b };
        let finished = run_pairing(&app, &tournament_id, &pairing, &winner).await;
        assert_eq!(finished.status, LiveMatchStatus::Completed);

        played += 1;
        assert!(played < 40, "bracket did not converge");
    }

    let state = app.bracket.get_tournament(&tournament_id).await.unwrap();
    assert_eq!(state.status, TournamentStatus::Completed);

    let champion = state.champion_id.clone().expect("champion decided");
    assert!(!state.records[&champion].eliminated);

    // Double elimination: everyone but the champion (and possibly the
    // runner-up) took exactly two losses; nobody took more.
    for (team_id, record) in &state.records {
        assert!(record.losses <= 2, "{} lost more than twice", team_id);
        assert_eq!(record.eliminated, record.losses >= 2);
    }

    // Every completed match carries exactly one history entry
    for m in state.matches.values() {
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.history.len(), 1, "{} history malformed", m.label);
        assert!(m.live_match_id.is_none());
    }

    // No live matches left in memory; only terminal snapshots remain
    assert!(app.engine.active_matches(&tournament_id).await.is_empty());
}

#[tokio::test]
async fn losers_champion_taking_the_grand_final_forces_a_reset() {
    let app = test_app(quick_settings(), 9);
    let created = app.bracket.create_tournament(&team_ids(8), &[]).await;
    let tournament_id = created.id.clone();

    // Play everything up to the grand final, lower id winning
    loop {
        let finals = app
            .bracket
            .list_matches_for_stage(&tournament_id, StageId::Final1)
            .await;
        if finals
            .first()
            .map(|m| m.status == MatchStatus::Scheduled)
            .unwrap_or(false)
        {
            break;
        }
        let pairing = next_scheduled(&app, &tournament_id)
            .await
            .expect("bracket stalled before the grand final");
        let a = pairing.teams[0].clone().unwrap();
        let b = pairing.teams[1].clone().unwrap();
        let winner = if a < b { a } else { b };
        run_pairing(&app, &tournament_id, &pairing, &winner).await;
    }

    let grand_final = app
        .bracket
        .list_matches_for_stage(&tournament_id, StageId::Final1)
        .await
        .remove(0);
    let winners_champion = grand_final.teams[0].clone().unwrap();
    let losers_champion = grand_final.teams[1].clone().unwrap();

    // Losers-bracket champion takes final-1: the bracket resets
    run_pairing(&app, &tournament_id, &grand_final, &losers_champion).await;

    let state = app.bracket.get_tournament(&tournament_id).await.unwrap();
    assert_ne!(state.status, TournamentStatus::Completed);

    let reset_matches = app
        .bracket
        .list_matches_for_stage(&tournament_id, StageId::Final2)
        .await;
    assert_eq!(reset_matches.len(), 1);
    let reset = reset_matches.into_iter().next().unwrap();
    assert!(reset.involves(&winners_champion));
    assert!(reset.involves(&losers_champion));

    // Winners champion takes final-2: champion crowned
    run_pairing(&app, &tournament_id, &reset, &winners_champion).await;
    let state = app.bracket.get_tournament(&tournament_id).await.unwrap();
    assert_eq!(state.status, TournamentStatus::Completed);
    assert_eq!(state.champion_id.as_deref(), Some(winners_champion.as_str()));
}

#[tokio::test]
async fn tied_live_match_replays_before_the_bracket_advances() {
    let app = test_app(quick_settings(), 2);
    let created = app.bracket.create_tournament(&team_ids(4), &[]).await;
    let tournament_id = created.id.clone();

    let pairing = next_scheduled(&app, &tournament_id).await.unwrap();
    let team_a = pairing.teams[0].clone().unwrap();
    let team_b = pairing.teams[1].clone().unwrap();

    let live = app
        .engine
        .create_live_match(&team_a, &team_b, None, &pairing.id, &tournament_id)
        .await;
    app.engine.flip_coin(&live.id, Some(&team_a)).await.unwrap();
    app.engine
        .decide_first(&live.id, &team_a, &team_a)
        .await
        .unwrap();

    // Both teams miss everything: 0-0, so the match resets instead of
    // reporting into the bracket.
    let mut state = app.engine.join_match(&live.id).await.unwrap();
    while state.status == LiveMatchStatus::InProgress {
        let acting = state.active_team_id.clone().unwrap();
        state = app
            .engine
            .submit_answer(&live.id, &acting, "wrong")
            .await
            .unwrap();
    }
    assert_eq!(state.status, LiveMatchStatus::CoinToss);

    let bracket_state = app.bracket.get_tournament(&tournament_id).await.unwrap();
    let bracket_match = &bracket_state.matches[&pairing.id];
    assert_ne!(bracket_match.status, MatchStatus::Completed);
    assert!(bracket_match.winner_id.is_none());

    // The replay produces a strict winner and the bracket moves on
    app.engine.flip_coin(&live.id, Some(&team_a)).await.unwrap();
    app.engine
        .decide_first(&live.id, &team_a, &team_a)
        .await
        .unwrap();
    utils::play_live_match(&app.engine, &live.id, &team_a).await;

    let bracket_state = app.bracket.get_tournament(&tournament_id).await.unwrap();
    let bracket_match = &bracket_state.matches[&pairing.id];
    assert_eq!(bracket_match.status, MatchStatus::Completed);
    assert_eq!(bracket_match.winner_id.as_deref(), Some(team_a.as_str()));
}

#[tokio::test]
async fn find_match_for_teams_locates_the_live_pairing() {
    let app = test_app(quick_settings(), 4);
    let created = app.bracket.create_tournament(&team_ids(4), &[]).await;
    let pairing = next_scheduled(&app, &created.id).await.unwrap();
    let team_a = pairing.teams[0].clone().unwrap();
    let team_b = pairing.teams[1].clone().unwrap();

    let found = app
        .bracket
        .find_match_for_teams(&created.id, &team_b, &team_a)
        .await
        .unwrap();
    assert_eq!(found.id, pairing.id);
}
