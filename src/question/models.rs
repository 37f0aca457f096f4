use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One answer choice attached to a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub key: String,
    pub text: String,
}

/// A question as it lives in the bank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: String,
    pub prompt: String,
    pub category: String,
    pub answers: Vec<AnswerOption>,
    pub correct_answer_key: String,
}

impl QuestionRecord {
    /// The canonical text of the correct answer, if the key resolves
    pub fn correct_answer_text(&self) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| a.key == self.correct_answer_key)
            .map(|a| a.text.as_str())
    }
}

/// A question materialized into a match's queue
///
/// The same bank question can be drawn into several matches; each draw gets
/// its own instance id so history entries stay distinguishable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawnQuestion {
    pub instance_id: String,
    pub source_id: String,
    pub prompt: String,
    pub category: String,
    pub answers: Vec<AnswerOption>,
    pub correct_answer_key: String,
    /// Display order of answer texts, derived from `answers`
    pub options: Vec<String>,
}

impl DrawnQuestion {
    pub fn materialize(record: &QuestionRecord, position: usize) -> Self {
        let instance_id = format!(
            "{}-{}-{}",
            record.id,
            Utc::now().timestamp_millis(),
            position
        );

        Self {
            instance_id,
            source_id: record.id.clone(),
            prompt: record.prompt.clone(),
            category: record.category.clone(),
            answers: record.answers.clone(),
            correct_answer_key: record.correct_answer_key.clone(),
            options: record.answers.iter().map(|a| a.text.clone()).collect(),
        }
    }

    pub fn correct_answer_text(&self) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| a.key == self.correct_answer_key)
            .map(|a| a.text.as_str())
    }

    /// Checks a submitted value against the correct key, the canonical answer
    /// text, or any option whose key matches the correct key. First match wins.
    pub fn is_correct(&self, answer_value: &str) -> bool {
        if answer_value == self.correct_answer_key {
            return true;
        }
        if self.correct_answer_text() == Some(answer_value) {
            return true;
        }
        self.answers
            .iter()
            .any(|a| a.key == self.correct_answer_key && a.text == answer_value)
    }
}
