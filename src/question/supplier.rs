use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::models::{DrawnQuestion, QuestionRecord};

/// Source of questions for live matches
///
/// A draw must return exactly `count` questions. Unseen questions (within the
/// tournament scope) are preferred; once the unseen pool runs dry the supplier
/// reuses already-asked questions rather than shorting the draw. Drawing marks
/// the questions as used.
#[async_trait]
pub trait QuestionSupplier: Send + Sync {
    async fn draw(&self, count: usize, tournament_id: &str) -> Vec<DrawnQuestion>;
}

/// In-memory question bank with per-tournament usage counters
pub struct InMemoryQuestionSupplier {
    bank: Arc<RwLock<Vec<QuestionRecord>>>,
    /// tournament_id -> (question_id -> times drawn)
    usage: Arc<RwLock<HashMap<String, HashMap<String, u32>>>>,
}

impl InMemoryQuestionSupplier {
    pub fn new(bank: Vec<QuestionRecord>) -> Self {
        Self {
            bank: Arc::new(RwLock::new(bank)),
            usage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn add_question(&self, record: QuestionRecord) {
        self.bank.write().await.push(record);
    }

    pub async fn usage_count(&self, tournament_id: &str, question_id: &str) -> u32 {
        self.usage
            .read()
            .await
            .get(tournament_id)
            .and_then(|counts| counts.get(question_id))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl QuestionSupplier for InMemoryQuestionSupplier {
    async fn draw(&self, count: usize, tournament_id: &str) -> Vec<DrawnQuestion> {
        let bank = self.bank.read().await;
        let mut usage = self.usage.write().await;
        let counts = usage.entry(tournament_id.to_string()).or_default();

        // Least-used first, so unseen questions come before any reuse and
        // reuse is biased away from the most recently exhausted ones.
        let mut ordered: Vec<&QuestionRecord> = bank.iter().collect();
        ordered.sort_by_key(|record| {
            (
                counts.get(&record.id).copied().unwrap_or(0),
                record.id.clone(),
            )
        });

        let mut drawn = Vec::with_capacity(count);
        if ordered.is_empty() {
            return drawn;
        }

        let mut cursor = 0;
        while drawn.len() < count {
            let record = ordered[cursor % ordered.len()];
            *counts.entry(record.id.clone()).or_insert(0) += 1;
            drawn.push(DrawnQuestion::materialize(record, drawn.len()));
            cursor += 1;
        }

        let reused = drawn.len().saturating_sub(ordered.len());
        debug!(
            tournament_id = %tournament_id,
            requested = count,
            reused = reused.min(count),
            "Drew questions from bank"
        );

        drawn
    }
}
