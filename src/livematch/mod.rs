// Public API
pub use engine::LiveMatchEngine;
pub use models::{
    CoinFace, CoinToss, CoinTossDecision, CoinTossStatus, LiveMatch, LiveMatchStatus, MatchTimer,
    TimerKind, TimerStatus,
};
pub use timer::{TimerController, TimerExpired};

// Internal modules
mod engine;
mod models;
mod timer;
