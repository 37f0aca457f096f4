#![allow(dead_code)]

use quizclash::bracket::{BracketMatch, BracketService};
use quizclash::config::EngineSettings;
use quizclash::event::EventBus;
use quizclash::livematch::{LiveMatch, LiveMatchEngine, LiveMatchStatus};
use quizclash::question::{AnswerOption, InMemoryQuestionSupplier, QuestionRecord};
use quizclash::snapshot::InMemorySnapshotStore;
use quizclash::team::InMemoryTeamDirectory;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Fully wired engine pair: live matches report straight into the bracket
pub struct TestApp {
    pub bracket: Arc<BracketService>,
    pub engine: Arc<LiveMatchEngine>,
    pub snapshots: Arc<InMemorySnapshotStore>,
    pub event_bus: EventBus,
}

pub fn test_app(settings: EngineSettings, seed: u64) -> TestApp {
    let event_bus = EventBus::with_default_capacity();
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let bracket = Arc::new(BracketService::with_rng(
        event_bus.clone(),
        StdRng::seed_from_u64(seed),
    ));
    let engine = LiveMatchEngine::with_rng(
        settings,
        Arc::new(InMemoryQuestionSupplier::new(question_bank(40))),
        snapshots.clone(),
        bracket.clone(),
        Arc::new(InMemoryTeamDirectory::new()),
        event_bus.clone(),
        StdRng::seed_from_u64(seed.wrapping_add(1)),
    );
    TestApp {
        bracket,
        engine,
        snapshots,
        event_bus,
    }
}

pub fn team_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("team-{:02}", i)).collect()
}

/// Bank where every question's correct key is "a"
pub fn question_bank(size: usize) -> Vec<QuestionRecord> {
    (0..size)
        .map(|i| QuestionRecord {
            id: format!("q-{:03}", i),
            prompt: format!("Question {}?", i),
            category: "general".to_string(),
            answers: vec![
                AnswerOption {
                    key: "a".to_string(),
                    text: format!("Right answer {}", i),
                },
                AnswerOption {
                    key: "b".to_string(),
                    text: format!("Wrong answer {}", i),
                },
            ],
            correct_answer_key: "a".to_string(),
        })
        .collect()
}

/// Launches a live match for a bracket pairing and plays it so `winner`
/// sweeps every one of its own questions and nothing else scores.
pub async fn run_pairing(
    app: &TestApp,
    tournament_id: &str,
    pairing: &BracketMatch,
    winner: &str,
) -> LiveMatch {
    let team_a = pairing.teams[0].clone().expect("pairing has both teams");
    let team_b = pairing.teams[1].clone().expect("pairing has both teams");
    let live = app
        .engine
        .create_live_match(
            &team_a,
            &team_b,
            pairing.moderator_id.clone(),
            &pairing.id,
            tournament_id,
        )
        .await;

    app.engine
        .flip_coin(&live.id, Some(winner))
        .await
        .expect("coin flip");
    app.engine
        .decide_first(&live.id, winner, winner)
        .await
        .expect("decide first");
    play_live_match(&app.engine, &live.id, winner).await
}

/// Drives an in-progress match to its end: `winner` answers its own
/// questions correctly and nobody converts a steal.
pub async fn play_live_match(
    engine: &LiveMatchEngine,
    match_id: &str,
    winner: &str,
) -> LiveMatch {
    let mut state = engine.join_match(match_id).await.expect("match exists");
    let mut steps = 0;
    while state.status == LiveMatchStatus::InProgress {
        let acting = state.active_team_id.clone().expect("someone is acting");
        let answer = if acting == winner && !state.awaiting_steal {
            "a"
        } else {
            "definitely wrong"
        };
        state = engine
            .submit_answer(match_id, &acting, answer)
            .await
            .expect("valid transition");
        steps += 1;
        assert!(steps < 100, "match did not terminate");
    }
    state
}
