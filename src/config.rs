use std::time::Duration;

/// Points awarded for answering your own question correctly
pub const PRIMARY_QUESTION_POINTS: i32 = 3;

/// Points awarded for a successful steal
pub const STEAL_QUESTION_POINTS: i32 = 1;

/// Tunable engine settings, read from the environment at startup
///
/// Every knob has a default so the engine runs without any configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Number of questions assigned to each team (queue length is twice this)
    pub questions_per_team: usize,
    /// Time allowed for a team to answer its own question
    pub primary_timer: Duration,
    /// Time allowed for the opposing team to attempt a steal
    pub steal_timer: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            questions_per_team: 5,
            primary_timer: Duration::from_secs(30),
            steal_timer: Duration::from_secs(15),
        }
    }
}

impl EngineSettings {
    /// Builds settings from `QUIZCLASH_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            questions_per_team: env_usize("QUIZCLASH_QUESTIONS_PER_TEAM")
                .unwrap_or(defaults.questions_per_team),
            primary_timer: env_secs("QUIZCLASH_PRIMARY_TIMER_SECS")
                .unwrap_or(defaults.primary_timer),
            steal_timer: env_secs("QUIZCLASH_STEAL_TIMER_SECS").unwrap_or(defaults.steal_timer),
        }
    }

    pub fn timer_duration(&self, kind: crate::livematch::TimerKind) -> Duration {
        match kind {
            crate::livematch::TimerKind::Primary => self.primary_timer,
            crate::livematch::TimerKind::Steal => self.steal_timer,
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.parse().ok()
}

fn env_secs(key: &str) -> Option<Duration> {
    Some(Duration::from_secs(std::env::var(key).ok()?.parse().ok()?))
}
