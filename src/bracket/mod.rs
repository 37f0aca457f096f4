// Public API
pub use models::{
    BracketMatch, CompletionRecord, MatchOutcome, MatchStatus, Stage, StageTally, TeamRecord,
    TournamentState, TournamentStatus,
};
pub use service::{BracketResultSink, BracketService};
pub use stages::{BracketSide, StageId};

// Internal modules
mod engine;
mod models;
mod service;
mod stages;
