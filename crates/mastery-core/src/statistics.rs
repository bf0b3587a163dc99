//! Performance statistics over a user's recent attempt history.

use serde::{Deserialize, Serialize};

use crate::model::AttemptRecord;

/// Number of most recent attempts considered.
pub const RECENT_WINDOW: usize = 50;

/// Number of most recent outcomes used for the consistency score.
pub const CONSISTENCY_WINDOW: usize = 20;

/// Below this many attempts consistency is reported as neutral.
pub const MIN_ATTEMPTS_FOR_CONSISTENCY: usize = 5;

/// Reference answer time used to normalize `avg_time_ratio`.
pub const EXPECTED_SECONDS_PER_ATTEMPT: f64 = 300.0;

/// Summary of recent performance used to pick an assignment type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Fraction of recent attempts answered correctly.
    pub recent_accuracy: f64,
    /// Mean answer time relative to `EXPECTED_SECONDS_PER_ATTEMPT`.
    pub avg_time_ratio: f64,
    /// 1 for perfectly steady outcomes, lower for erratic ones.
    pub consistency: f64,
    /// Attempts that went into this summary.
    pub sample_size: usize,
}

impl Default for PerformanceSummary {
    fn default() -> Self {
        Self {
            recent_accuracy: 0.5,
            avg_time_ratio: 1.0,
            consistency: 0.5,
            sample_size: 0,
        }
    }
}

impl PerformanceSummary {
    /// Summarize attempts ordered most recent first.
    pub fn from_attempts(history: &[AttemptRecord]) -> Self {
        let recent = &history[..history.len().min(RECENT_WINDOW)];
        if recent.is_empty() {
            return Self::default();
        }

        let n = recent.len() as f64;
        let correct = recent.iter().filter(|a| a.is_correct).count() as f64;
        let total_time: f64 = recent.iter().map(|a| a.time_taken_seconds as f64).sum();

        Self {
            recent_accuracy: correct / n,
            avg_time_ratio: total_time / (n * EXPECTED_SECONDS_PER_ATTEMPT),
            consistency: consistency(recent),
            sample_size: recent.len(),
        }
    }
}

/// Consistency score: `max(0, 1 - 2 * variance)` of the binary outcomes.
fn consistency(recent: &[AttemptRecord]) -> f64 {
    if recent.len() < MIN_ATTEMPTS_FOR_CONSISTENCY {
        return 0.5;
    }
    let outcomes: Vec<f64> = recent
        .iter()
        .take(CONSISTENCY_WINDOW)
        .map(|a| if a.is_correct { 1.0 } else { 0.0 })
        .collect();

    let mean = outcomes.iter().sum::<f64>() / outcomes.len() as f64;
    let variance =
        outcomes.iter().map(|o| (o - mean).powi(2)).sum::<f64>() / outcomes.len() as f64;

    (1.0 - variance * 2.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(is_correct: bool, secs: u32) -> AttemptRecord {
        AttemptRecord {
            user_id: Uuid::nil(),
            question_id: Uuid::nil(),
            topic: "Arrays".into(),
            is_correct,
            time_taken_seconds: secs,
            xp_earned: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_history_is_neutral() {
        assert_eq!(
            PerformanceSummary::from_attempts(&[]),
            PerformanceSummary::default()
        );
    }

    #[test]
    fn accuracy_and_time_ratio() {
        let history = vec![record(true, 300), record(false, 600), record(true, 0), record(true, 300)];
        let summary = PerformanceSummary::from_attempts(&history);
        assert!((summary.recent_accuracy - 0.75).abs() < 1e-12);
        assert!((summary.avg_time_ratio - 1.0).abs() < 1e-12);
        // fewer than five attempts
        assert_eq!(summary.consistency, 0.5);
        assert_eq!(summary.sample_size, 4);
    }

    #[test]
    fn steady_outcomes_are_consistent() {
        let history: Vec<_> = (0..10).map(|_| record(true, 60)).collect();
        assert_eq!(PerformanceSummary::from_attempts(&history).consistency, 1.0);
    }

    #[test]
    fn alternating_outcomes_are_inconsistent() {
        let history: Vec<_> = (0..10).map(|i| record(i % 2 == 0, 60)).collect();
        // variance 0.25 -> 1 - 0.5
        let summary = PerformanceSummary::from_attempts(&history);
        assert!((summary.consistency - 0.5).abs() < 1e-12);
    }

    #[test]
    fn only_recent_window_counts() {
        let mut history: Vec<_> = (0..RECENT_WINDOW).map(|_| record(true, 10)).collect();
        history.extend((0..100).map(|_| record(false, 10)));
        let summary = PerformanceSummary::from_attempts(&history);
        assert_eq!(summary.recent_accuracy, 1.0);
        assert_eq!(summary.sample_size, RECENT_WINDOW);
    }
}
