use axum::{routing::get, Router};
use quizclash::bracket::BracketService;
use quizclash::config::EngineSettings;
use quizclash::event::EventBus;
use quizclash::livematch::LiveMatchEngine;
use quizclash::question::InMemoryQuestionSupplier;
use quizclash::shared::AppState;
use quizclash::snapshot::InMemorySnapshotStore;
use quizclash::team::InMemoryTeamDirectory;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizclash=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting quiz tournament engine");

    let settings = EngineSettings::from_env();
    let event_bus = EventBus::with_default_capacity();

    // Wire the engines with dependency injection.
    // Easy to switch between implementations:
    let snapshot_store = Arc::new(InMemorySnapshotStore::new());
    let question_supplier = Arc::new(InMemoryQuestionSupplier::new(Vec::new()));
    let team_directory = Arc::new(InMemoryTeamDirectory::new());

    // For production with PostgreSQL:
    // let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    // let pool = sqlx::PgPool::connect(&database_url).await.expect("Failed to connect to database");
    // let snapshot_store = Arc::new(quizclash::snapshot::PostgresSnapshotStore::new(pool));

    let bracket = Arc::new(BracketService::new(event_bus.clone()));
    let matches = LiveMatchEngine::new(
        settings,
        question_supplier,
        snapshot_store,
        bracket.clone(),
        team_directory,
        event_bus.clone(),
    );

    let app_state = AppState::new(bracket, matches, event_bus);

    // Routing proper lives in the outer layer; this binary only exposes a
    // health probe so the engines can run standalone.
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
