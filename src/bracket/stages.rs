use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Which partition of the tournament a stage or match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BracketSide {
    Winners,
    Losers,
    Finals,
}

/// The fixed eleven stages of the double-elimination bracket
///
/// The declaration order is the scheduling dependency order: a stage can only
/// be populated once the stages it draws teams from have resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum StageId {
    #[serde(rename = "winners-r1")]
    #[strum(serialize = "winners-r1")]
    WinnersR1,
    #[serde(rename = "losers-r1")]
    #[strum(serialize = "losers-r1")]
    LosersR1,
    #[serde(rename = "winners-r2")]
    #[strum(serialize = "winners-r2")]
    WinnersR2,
    #[serde(rename = "losers-r2")]
    #[strum(serialize = "losers-r2")]
    LosersR2,
    #[serde(rename = "winners-r3-playoff")]
    #[strum(serialize = "winners-r3-playoff")]
    WinnersR3Playoff,
    #[serde(rename = "winners-r3-final")]
    #[strum(serialize = "winners-r3-final")]
    WinnersR3Final,
    #[serde(rename = "losers-r3")]
    #[strum(serialize = "losers-r3")]
    LosersR3,
    #[serde(rename = "losers-r4-playoff")]
    #[strum(serialize = "losers-r4-playoff")]
    LosersR4Playoff,
    #[serde(rename = "losers-r4-final")]
    #[strum(serialize = "losers-r4-final")]
    LosersR4Final,
    #[serde(rename = "final-1")]
    #[strum(serialize = "final-1")]
    Final1,
    #[serde(rename = "final-2")]
    #[strum(serialize = "final-2")]
    Final2,
}

impl StageId {
    /// All stages in scheduling dependency order
    pub const ALL: [StageId; 11] = [
        StageId::WinnersR1,
        StageId::LosersR1,
        StageId::WinnersR2,
        StageId::LosersR2,
        StageId::WinnersR3Playoff,
        StageId::WinnersR3Final,
        StageId::LosersR3,
        StageId::LosersR4Playoff,
        StageId::LosersR4Final,
        StageId::Final1,
        StageId::Final2,
    ];

    pub fn bracket(&self) -> BracketSide {
        match self {
            StageId::WinnersR1
            | StageId::WinnersR2
            | StageId::WinnersR3Playoff
            | StageId::WinnersR3Final => BracketSide::Winners,
            StageId::LosersR1
            | StageId::LosersR2
            | StageId::LosersR3
            | StageId::LosersR4Playoff
            | StageId::LosersR4Final => BracketSide::Losers,
            StageId::Final1 | StageId::Final2 => BracketSide::Finals,
        }
    }

    pub fn order(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageId::WinnersR1 => "Winners Round 1",
            StageId::LosersR1 => "Losers Round 1",
            StageId::WinnersR2 => "Winners Round 2",
            StageId::LosersR2 => "Losers Round 2",
            StageId::WinnersR3Playoff => "Winners Round 3 Playoff",
            StageId::WinnersR3Final => "Winners Round 3 Final",
            StageId::LosersR3 => "Losers Round 3",
            StageId::LosersR4Playoff => "Losers Round 4 Playoff",
            StageId::LosersR4Final => "Losers Round 4 Final",
            StageId::Final1 => "Grand Final",
            StageId::Final2 => "Grand Final Reset",
        }
    }
}
