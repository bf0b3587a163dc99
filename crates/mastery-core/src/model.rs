//! Core data model types for mastery tracking.
//!
//! These are the snapshots the engine consumes and produces: per-topic
//! mastery records, attempt events, and question metadata.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MasteryError, Result};

/// Neutral mastery assigned to a topic before its first attempt.
pub const DEFAULT_MASTERY: f64 = 0.5;

/// Default XP reward for a question that does not set one.
pub const DEFAULT_XP_REWARD: u32 = 10;

/// Question difficulty. Closed set, ordered from easiest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    /// All difficulties in ascending order.
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    /// Multiplier applied to mastery deltas for this difficulty.
    pub fn weight(self) -> f64 {
        match self {
            Difficulty::Easy => 0.5,
            Difficulty::Medium => 1.0,
            Difficulty::Hard => 1.5,
            Difficulty::Expert => 2.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Difficulty {
    type Error = MasteryError;

    fn try_from(label: String) -> Result<Self> {
        label.parse()
    }
}

impl FromStr for Difficulty {
    type Err = MasteryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            other => Err(MasteryError::Configuration(format!(
                "unknown difficulty label: {other}"
            ))),
        }
    }
}

/// Identity of a topic record: a topic, optionally refined by a subtopic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicKey {
    pub topic: String,
    #[serde(default)]
    pub subtopic: Option<String>,
}

impl TopicKey {
    pub fn new(topic: impl Into<String>, subtopic: Option<String>) -> Self {
        Self {
            topic: topic.into(),
            subtopic,
        }
    }

    /// Display label: `topic` or `topic/subtopic`.
    pub fn label(&self) -> String {
        match &self.subtopic {
            Some(sub) => format!("{}/{}", self.topic, sub),
            None => self.topic.clone(),
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Mastery state for one (user, topic[, subtopic]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMastery {
    pub topic: String,
    #[serde(default)]
    pub subtopic: Option<String>,
    /// Current skill estimate in `[0, 1]`.
    #[serde(default = "default_mastery")]
    pub mastery_probability: f64,
    #[serde(default)]
    pub total_attempts: u32,
    #[serde(default)]
    pub correct_attempts: u32,
    /// Running mean of time-to-answer over all attempts.
    #[serde(default)]
    pub average_time_seconds: f64,
    #[serde(default)]
    pub last_attempted: Option<DateTime<Utc>>,
}

fn default_mastery() -> f64 {
    DEFAULT_MASTERY
}

impl TopicMastery {
    /// A fresh record at the neutral default, before any attempt.
    pub fn new(key: TopicKey) -> Self {
        Self {
            topic: key.topic,
            subtopic: key.subtopic,
            mastery_probability: DEFAULT_MASTERY,
            total_attempts: 0,
            correct_attempts: 0,
            average_time_seconds: 0.0,
            last_attempted: None,
        }
    }

    pub fn key(&self) -> TopicKey {
        TopicKey::new(self.topic.clone(), self.subtopic.clone())
    }

    pub fn label(&self) -> String {
        self.key().label()
    }

    /// Fraction of attempts answered correctly (0 with no attempts).
    pub fn accuracy(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            self.correct_attempts as f64 / self.total_attempts as f64
        }
    }

    /// Check the record's invariants.
    ///
    /// Violations are reported, never corrected: a bad value here means the
    /// stored snapshot was written by something other than the engine.
    pub fn validate(&self) -> Result<()> {
        if !self.mastery_probability.is_finite()
            || !(0.0..=1.0).contains(&self.mastery_probability)
        {
            return Err(MasteryError::InvariantViolation(format!(
                "mastery_probability {} for '{}' is outside [0, 1]",
                self.mastery_probability,
                self.label()
            )));
        }
        if self.correct_attempts > self.total_attempts {
            return Err(MasteryError::InvariantViolation(format!(
                "correct_attempts {} exceeds total_attempts {} for '{}'",
                self.correct_attempts,
                self.total_attempts,
                self.label()
            )));
        }
        if !self.average_time_seconds.is_finite() || self.average_time_seconds < 0.0 {
            return Err(MasteryError::InvariantViolation(format!(
                "average_time_seconds {} for '{}' is not a non-negative number",
                self.average_time_seconds,
                self.label()
            )));
        }
        Ok(())
    }
}

/// A scored answer attempt, produced after the answer was verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub topic: String,
    #[serde(default)]
    pub subtopic: Option<String>,
    pub difficulty: Difficulty,
    pub is_correct: bool,
    pub time_taken_seconds: u32,
}

impl Attempt {
    pub fn key(&self) -> TopicKey {
        TopicKey::new(self.topic.clone(), self.subtopic.clone())
    }

    /// Reject payloads the engine cannot interpret.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(MasteryError::Validation(format!(
                "attempt on question {} has an empty topic",
                self.question_id
            )));
        }
        Ok(())
    }
}

/// A persisted attempt, kept as history for performance metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub topic: String,
    pub is_correct: bool,
    pub time_taken_seconds: u32,
    #[serde(default)]
    pub xp_earned: u32,
    pub created_at: DateTime<Utc>,
}

/// Kind of question in the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Coding,
    ShortAnswer,
    MultiStep,
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multiple_choice" | "mcq" => Ok(QuestionType::MultipleChoice),
            "coding" => Ok(QuestionType::Coding),
            "short_answer" => Ok(QuestionType::ShortAnswer),
            "multi_step" => Ok(QuestionType::MultiStep),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// One step of a multi-step question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionStep {
    /// 1-based position within the question.
    pub step_number: u32,
    pub description: String,
    #[serde(default)]
    pub expected_output: Option<String>,
    /// Predefined hints, from subtle to detailed.
    #[serde(default)]
    pub hints: Vec<String>,
    pub solution: String,
}

/// Question metadata the policies need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub topic: String,
    #[serde(default)]
    pub subtopic: Option<String>,
    pub difficulty: Difficulty,
    pub question_type: QuestionType,
    #[serde(default)]
    pub steps: Vec<QuestionStep>,
    #[serde(default = "default_xp_reward")]
    pub xp_reward: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_xp_reward() -> u32 {
    DEFAULT_XP_REWARD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parse_and_display() {
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!(" Expert ".parse::<Difficulty>().unwrap(), Difficulty::Expert);
        assert_eq!(Difficulty::Hard.to_string(), "hard");

        let err = "legendary".parse::<Difficulty>().unwrap_err();
        assert!(matches!(err, MasteryError::Configuration(_)));
    }

    #[test]
    fn difficulty_weights_ascend() {
        let weights: Vec<f64> = Difficulty::ALL.iter().map(|d| d.weight()).collect();
        assert_eq!(weights, vec![0.5, 1.0, 1.5, 2.0]);
        assert!(Difficulty::Easy < Difficulty::Expert);
    }

    #[test]
    fn topic_label() {
        assert_eq!(TopicKey::new("Arrays", None).label(), "Arrays");
        assert_eq!(
            TopicKey::new("Arrays", Some("Two pointers".into())).label(),
            "Arrays/Two pointers"
        );
    }

    #[test]
    fn new_record_is_neutral_and_valid() {
        let record = TopicMastery::new(TopicKey::new("Graphs", None));
        assert_eq!(record.mastery_probability, DEFAULT_MASTERY);
        assert_eq!(record.total_attempts, 0);
        assert_eq!(record.accuracy(), 0.0);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_mastery() {
        let mut record = TopicMastery::new(TopicKey::new("Graphs", None));
        record.mastery_probability = 1.2;
        assert!(matches!(
            record.validate(),
            Err(MasteryError::InvariantViolation(_))
        ));
        record.mastery_probability = f64::NAN;
        assert!(record.validate().is_err());
    }

    #[test]
    fn validate_rejects_more_correct_than_total() {
        let mut record = TopicMastery::new(TopicKey::new("Graphs", None));
        record.total_attempts = 2;
        record.correct_attempts = 3;
        assert!(matches!(
            record.validate(),
            Err(MasteryError::InvariantViolation(_))
        ));
    }

    #[test]
    fn negative_counts_rejected_at_deserialization() {
        let json = r#"{"topic":"Arrays","mastery_probability":0.5,"total_attempts":-1}"#;
        assert!(serde_json::from_str::<TopicMastery>(json).is_err());
    }

    #[test]
    fn unknown_difficulty_rejected_at_deserialization() {
        let json = format!(
            r#"{{"user_id":"{}","question_id":"{}","topic":"Arrays","difficulty":"insane","is_correct":true,"time_taken_seconds":3}}"#,
            Uuid::nil(),
            Uuid::nil()
        );
        let err = serde_json::from_str::<Attempt>(&json).unwrap_err();
        assert!(err.to_string().contains("unknown difficulty label: insane"));
    }

    #[test]
    fn question_defaults() {
        let json = format!(
            r#"{{"id":"{}","title":"Sum","topic":"Arrays","difficulty":"medium","question_type":"coding"}}"#,
            Uuid::nil()
        );
        let q: Question = serde_json::from_str(&json).unwrap();
        assert_eq!(q.xp_reward, DEFAULT_XP_REWARD);
        assert!(q.steps.is_empty());
        assert_eq!(q.question_type, QuestionType::Coding);
    }
}
