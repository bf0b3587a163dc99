//! Mastery update engine.
//!
//! Turns one scored attempt into the next mastery snapshot for a topic.
//! The recurrence has diminishing returns on both ends: a correct answer
//! moves mastery by a fraction of the remaining distance to 1, a wrong one
//! by a fraction of the distance to 0. Harder questions scale gains up and
//! losses down.

use chrono::{DateTime, Utc};

use crate::error::{MasteryError, Result};
use crate::model::{Attempt, Difficulty, TopicMastery};

/// Learning rate for a topic with no prior attempts.
pub const BASE_LEARNING_RATE: f64 = 0.1;

/// How quickly the learning rate decays with accumulated attempts.
pub const LEARNING_RATE_DECAY: f64 = 0.1;

/// Per-update learning rate given the attempt count *before* the update.
///
/// `BASE_LEARNING_RATE / (1 + LEARNING_RATE_DECAY * total_attempts)`:
/// strictly decreasing, approaches but never reaches zero.
pub fn learning_rate(total_attempts: u32) -> f64 {
    BASE_LEARNING_RATE / (1.0 + LEARNING_RATE_DECAY * total_attempts as f64)
}

/// Compute the next mastery probability.
///
/// Fails with [`MasteryError::InvariantViolation`] if `current_mastery` is
/// not a number in `[0, 1]`.
pub fn update(
    current_mastery: f64,
    total_attempts: u32,
    is_correct: bool,
    difficulty: Difficulty,
) -> Result<f64> {
    if !current_mastery.is_finite() || !(0.0..=1.0).contains(&current_mastery) {
        return Err(MasteryError::InvariantViolation(format!(
            "current mastery {current_mastery} is outside [0, 1]"
        )));
    }

    let rate = learning_rate(total_attempts);
    let weight = difficulty.weight();

    let next = if is_correct {
        let delta = rate * weight * (1.0 - current_mastery);
        (current_mastery + delta).min(1.0)
    } else {
        let delta = rate * (1.0 / weight) * current_mastery;
        (current_mastery - delta).max(0.0)
    };

    Ok(next)
}

/// Same as [`update`], taking the difficulty as a raw label.
///
/// Unknown labels fail with [`MasteryError::Configuration`]; no weight is
/// ever guessed.
pub fn update_with_label(
    current_mastery: f64,
    total_attempts: u32,
    is_correct: bool,
    difficulty: &str,
) -> Result<f64> {
    let difficulty: Difficulty = difficulty.parse()?;
    update(current_mastery, total_attempts, is_correct, difficulty)
}

/// Apply an attempt to a topic snapshot and return the next snapshot.
///
/// This is the only function that produces a changed `TopicMastery`. The
/// input record is left untouched; persisting the result atomically is the
/// caller's job.
pub fn apply_attempt(
    record: &TopicMastery,
    attempt: &Attempt,
    now: DateTime<Utc>,
) -> Result<TopicMastery> {
    attempt.validate()?;
    record.validate()?;

    if record.key() != attempt.key() {
        return Err(MasteryError::Validation(format!(
            "attempt for '{}' applied to record '{}'",
            attempt.key(),
            record.label()
        )));
    }

    let mut next = record.clone();
    next.mastery_probability = update(
        record.mastery_probability,
        record.total_attempts,
        attempt.is_correct,
        attempt.difficulty,
    )?;

    next.total_attempts = record.total_attempts.checked_add(1).ok_or_else(|| {
        MasteryError::InvariantViolation(format!(
            "attempt counter overflow for '{}'",
            record.label()
        ))
    })?;
    if attempt.is_correct {
        next.correct_attempts += 1;
    }

    let n = next.total_attempts as f64;
    next.average_time_seconds =
        (record.average_time_seconds * (n - 1.0) + attempt.time_taken_seconds as f64) / n;
    next.last_attempted = Some(now);

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TopicKey;
    use uuid::Uuid;

    const EPS: f64 = 1e-12;

    fn attempt(topic: &str, difficulty: Difficulty, is_correct: bool, secs: u32) -> Attempt {
        Attempt {
            user_id: Uuid::nil(),
            question_id: Uuid::nil(),
            topic: topic.into(),
            subtopic: None,
            difficulty,
            is_correct,
            time_taken_seconds: secs,
        }
    }

    #[test]
    fn learning_rate_starts_at_base() {
        assert!((learning_rate(0) - 0.1).abs() < EPS);
        assert!((learning_rate(10) - 0.05).abs() < EPS);
    }

    #[test]
    fn learning_rate_decays_but_stays_positive() {
        let mut prev = learning_rate(0);
        for a in 1..500 {
            let rate = learning_rate(a);
            assert!(rate < prev, "rate must strictly decrease at {a}");
            assert!(rate > 0.0);
            prev = rate;
        }
        assert!(learning_rate(u32::MAX) > 0.0);
    }

    #[test]
    fn correct_medium_from_neutral() {
        let next = update(0.5, 0, true, Difficulty::Medium).unwrap();
        assert!((next - 0.55).abs() < EPS, "got {next}");
    }

    #[test]
    fn incorrect_easy_after_ten_attempts() {
        let next = update(0.5, 10, false, Difficulty::Easy).unwrap();
        assert!((next - 0.45).abs() < EPS, "got {next}");
    }

    #[test]
    fn boundaries_are_fixed_points() {
        assert_eq!(update(1.0, 50, true, Difficulty::Expert).unwrap(), 1.0);
        assert_eq!(update(0.0, 50, false, Difficulty::Easy).unwrap(), 0.0);
    }

    #[test]
    fn output_stays_in_range_and_moves_the_right_way() {
        for step in 0..=20 {
            let m = step as f64 / 20.0;
            for attempts in [0u32, 1, 5, 50, 1000] {
                for difficulty in Difficulty::ALL {
                    let up = update(m, attempts, true, difficulty).unwrap();
                    let down = update(m, attempts, false, difficulty).unwrap();
                    assert!((0.0..=1.0).contains(&up));
                    assert!((0.0..=1.0).contains(&down));
                    assert!(up >= m, "correct must not lower mastery ({m}, {difficulty})");
                    assert!(down <= m, "wrong must not raise mastery ({m}, {difficulty})");
                }
            }
        }
    }

    #[test]
    fn harder_questions_gain_more_and_lose_less() {
        let m = 0.5;
        let gain_easy = update(m, 3, true, Difficulty::Easy).unwrap() - m;
        let gain_expert = update(m, 3, true, Difficulty::Expert).unwrap() - m;
        assert!(gain_expert > gain_easy);

        let loss_easy = m - update(m, 3, false, Difficulty::Easy).unwrap();
        let loss_expert = m - update(m, 3, false, Difficulty::Expert).unwrap();
        assert!(loss_expert < loss_easy);
    }

    #[test]
    fn rejects_corrupted_input() {
        assert!(matches!(
            update(1.5, 0, true, Difficulty::Easy),
            Err(MasteryError::InvariantViolation(_))
        ));
        assert!(update(-0.1, 0, false, Difficulty::Easy).is_err());
        assert!(update(f64::NAN, 0, false, Difficulty::Easy).is_err());
    }

    #[test]
    fn unknown_label_is_configuration_error() {
        let err = update_with_label(0.5, 0, true, "nightmare").unwrap_err();
        assert!(matches!(err, MasteryError::Configuration(_)));
        assert!(update_with_label(0.5, 0, true, "medium").is_ok());
    }

    #[test]
    fn apply_attempt_updates_counters_and_time() {
        let now = Utc::now();
        let record = TopicMastery::new(TopicKey::new("Arrays", None));

        let first = apply_attempt(&record, &attempt("Arrays", Difficulty::Medium, true, 30), now)
            .unwrap();
        assert_eq!(first.total_attempts, 1);
        assert_eq!(first.correct_attempts, 1);
        assert!((first.average_time_seconds - 30.0).abs() < EPS);
        assert!((first.mastery_probability - 0.55).abs() < EPS);
        assert_eq!(first.last_attempted, Some(now));

        let second = apply_attempt(&first, &attempt("Arrays", Difficulty::Hard, false, 60), now)
            .unwrap();
        assert_eq!(second.total_attempts, 2);
        assert_eq!(second.correct_attempts, 1);
        assert!((second.average_time_seconds - 45.0).abs() < EPS);
        assert!(second.mastery_probability < first.mastery_probability);

        // input snapshot untouched
        assert_eq!(record.total_attempts, 0);
    }

    #[test]
    fn apply_attempt_rejects_mismatched_topic() {
        let record = TopicMastery::new(TopicKey::new("Arrays", None));
        let err = apply_attempt(
            &record,
            &attempt("Graphs", Difficulty::Easy, true, 5),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, MasteryError::Validation(_)));
    }

    #[test]
    fn apply_attempt_surfaces_corrupted_record() {
        let mut record = TopicMastery::new(TopicKey::new("Arrays", None));
        record.mastery_probability = 2.0;
        let err = apply_attempt(
            &record,
            &attempt("Arrays", Difficulty::Easy, true, 5),
            Utc::now(),
        )
        .unwrap_err();
        assert!(err.is_corruption());
    }
}
