//! User-level mastery profile aggregation.
//!
//! A profile is always recomputed from the complete set of a user's topic
//! records. `aggregate` is a pure function of its arguments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{TopicMastery, DEFAULT_MASTERY};

/// Mastery at or above which a topic counts as a strength.
pub const STRENGTH_THRESHOLD: f64 = 0.6;

/// Mastery below which a topic counts as a weakness.
pub const WEAKNESS_THRESHOLD: f64 = 0.4;

/// Attempts required before a topic is labelled a strength or weakness.
pub const MIN_ATTEMPTS_FOR_LABEL: u32 = 3;

/// Maximum number of recommended topics.
pub const RECOMMENDED_TOPIC_CAP: usize = 3;

/// Aggregated mastery for a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMasteryProfile {
    pub user_id: Uuid,
    pub topics: Vec<TopicMastery>,
    /// Attempt-weighted mean mastery across topics.
    pub overall_mastery: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommended_topics: Vec<String>,
    /// Most recent `last_attempted` among the topics.
    pub last_updated: Option<DateTime<Utc>>,
}

impl UserMasteryProfile {
    /// Look up a topic record by label (`topic` or `topic/subtopic`) or by
    /// bare topic name.
    pub fn topic(&self, label: &str) -> Option<&TopicMastery> {
        self.topics
            .iter()
            .find(|t| t.label() == label)
            .or_else(|| self.topics.iter().find(|t| t.topic == label))
    }

    /// Mastery for a topic, or the neutral default when unseen.
    pub fn mastery_for(&self, label: &str) -> f64 {
        self.topic(label)
            .map(|t| t.mastery_probability)
            .unwrap_or(DEFAULT_MASTERY)
    }

    pub fn total_attempts(&self) -> u64 {
        self.topics.iter().map(|t| t.total_attempts as u64).sum()
    }
}

/// Combine a user's topic records into a profile.
///
/// `known_topics` lists topic labels the caller knows about (for example
/// every topic in the question bank); untouched ones become recommendations
/// when the user has no weaknesses.
pub fn aggregate(
    user_id: Uuid,
    topics: &[TopicMastery],
    known_topics: &[String],
) -> UserMasteryProfile {
    let overall_mastery = overall_mastery(topics);

    let labelled = |t: &&TopicMastery| t.total_attempts >= MIN_ATTEMPTS_FOR_LABEL;

    let strengths: Vec<String> = topics
        .iter()
        .filter(labelled)
        .filter(|t| t.mastery_probability >= STRENGTH_THRESHOLD)
        .map(|t| t.label())
        .collect();

    let mut weak: Vec<&TopicMastery> = topics
        .iter()
        .filter(labelled)
        .filter(|t| t.mastery_probability < WEAKNESS_THRESHOLD)
        .collect();
    let weaknesses: Vec<String> = weak.iter().map(|t| t.label()).collect();

    let recommended_topics = if weak.is_empty() {
        coverage_gaps(topics, known_topics)
            .into_iter()
            .take(RECOMMENDED_TOPIC_CAP)
            .collect()
    } else {
        weak.sort_by(|a, b| {
            a.mastery_probability
                .total_cmp(&b.mastery_probability)
                .then_with(|| a.label().cmp(&b.label()))
        });
        weak.iter()
            .take(RECOMMENDED_TOPIC_CAP)
            .map(|t| t.label())
            .collect()
    };

    let last_updated = topics.iter().filter_map(|t| t.last_attempted).max();

    UserMasteryProfile {
        user_id,
        topics: topics.to_vec(),
        overall_mastery,
        strengths,
        weaknesses,
        recommended_topics,
        last_updated,
    }
}

/// Attempt-weighted mean of topic mastery; the neutral default when the
/// user has no attempts at all.
pub fn overall_mastery(topics: &[TopicMastery]) -> f64 {
    let total: u64 = topics.iter().map(|t| t.total_attempts as u64).sum();
    if total == 0 {
        return DEFAULT_MASTERY;
    }
    let weighted: f64 = topics
        .iter()
        .map(|t| t.mastery_probability * t.total_attempts as f64)
        .sum();
    weighted / total as f64
}

/// Known topics the user has never attempted, in the caller's order.
pub fn coverage_gaps(topics: &[TopicMastery], known_topics: &[String]) -> Vec<String> {
    let attempted = |label: &str| {
        topics
            .iter()
            .any(|t| t.total_attempts > 0 && (t.label() == label || t.topic == label))
    };

    let mut gaps: Vec<String> = Vec::new();
    for label in known_topics {
        if !attempted(label) && !gaps.contains(label) {
            gaps.push(label.clone());
        }
    }
    gaps
}
