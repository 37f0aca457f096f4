// Library crate for the quiz tournament engine
// This file exposes the public API for integration tests

pub mod bracket;
pub mod config;
pub mod event;
pub mod livematch;
pub mod question;
pub mod shared;
pub mod snapshot;
pub mod team;

// Re-export commonly used types for easier access in tests
pub use bracket::{BracketResultSink, BracketService, MatchOutcome, StageId, TournamentStatus};
pub use config::{EngineSettings, PRIMARY_QUESTION_POINTS, STEAL_QUESTION_POINTS};
pub use event::{ChangeEvent, EventBus};
pub use livematch::{LiveMatch, LiveMatchEngine, LiveMatchStatus};
pub use question::{InMemoryQuestionSupplier, QuestionRecord, QuestionSupplier};
pub use shared::{AppError, AppState};
pub use snapshot::{InMemorySnapshotStore, SnapshotStore};
pub use team::{InMemoryTeamDirectory, TeamDirectory};
