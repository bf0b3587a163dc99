//! Difficulty selection and step-wise hint escalation.
//!
//! Nothing here mutates mastery. Hints escalate per question step from a
//! subtle nudge to the full solution.

use serde::{Deserialize, Serialize};

use crate::error::{MasteryError, Result};
use crate::model::{Difficulty, Question, QuestionStep};
use crate::profile::UserMasteryProfile;

/// Upper bounds of the difficulty ladder; mastery at or above the last
/// bound maps to `Expert`.
pub const EASY_BELOW: f64 = 0.3;
pub const MEDIUM_BELOW: f64 = 0.6;
pub const HARD_BELOW: f64 = 0.85;

/// Free hints per step; once the step has this many failed attempts the
/// solution is revealed.
pub const MAX_FREE_HINTS: u32 = 3;

const REVEAL_FALLBACK_TEXT: &str = "Let me show you the solution.";

/// Map a mastery value to the difficulty to serve next.
pub fn difficulty_for_mastery(mastery: f64) -> Difficulty {
    if mastery < EASY_BELOW {
        Difficulty::Easy
    } else if mastery < MEDIUM_BELOW {
        Difficulty::Medium
    } else if mastery < HARD_BELOW {
        Difficulty::Hard
    } else {
        Difficulty::Expert
    }
}

/// Difficulty for the next question on `topic` given the user's profile.
pub fn next_difficulty(profile: &UserMasteryProfile, topic: &str) -> Difficulty {
    difficulty_for_mastery(profile.mastery_for(topic))
}

/// How much of a step's solution a hint gives away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintLevel {
    Subtle = 1,
    Moderate = 2,
    Detailed = 3,
}

impl HintLevel {
    /// Level for the next hint given previous failed attempts at the step.
    pub fn for_attempts(previous_attempts: u32) -> Self {
        match previous_attempts {
            0 => HintLevel::Subtle,
            1 => HintLevel::Moderate,
            _ => HintLevel::Detailed,
        }
    }

    pub fn number(self) -> u32 {
        self as u32
    }

    /// Instruction for a hint generator when no predefined hint exists.
    pub fn guidance(self) -> &'static str {
        match self {
            HintLevel::Subtle => {
                "Give a subtle hint that points in the right direction without revealing the approach"
            }
            HintLevel::Moderate => {
                "Give a moderate hint that explains the general approach without showing code"
            }
            HintLevel::Detailed => "Give a detailed hint that explains the exact steps needed",
        }
    }
}

/// Outcome of a hint request for one question step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintDecision {
    pub step_number: u32,
    pub hint_level: HintLevel,
    /// Predefined hint text, if the question carries one for this level.
    pub hint_text: Option<String>,
    /// Set when no predefined text exists: what an external generator
    /// should produce.
    pub generation_guidance: Option<String>,
    pub should_reveal_solution: bool,
    pub solution: Option<String>,
}

/// Solution for a single step, without revealing the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSolution {
    pub step_number: u32,
    pub solution: String,
    /// First hint of the following step, if any.
    pub next_step_hint: Option<String>,
}

fn step_at(question: &Question, step_number: u32) -> Result<&QuestionStep> {
    if question.steps.is_empty() {
        return Err(MasteryError::Validation(format!(
            "question {} does not have steps",
            question.id
        )));
    }
    if step_number == 0 || step_number as usize > question.steps.len() {
        return Err(MasteryError::Validation(format!(
            "invalid step number {step_number} for question {} ({} steps)",
            question.id,
            question.steps.len()
        )));
    }
    Ok(&question.steps[step_number as usize - 1])
}

/// Decide the next hint for `step_number` (1-based).
///
/// `previous_attempts` is the caller's count of failed attempts at this
/// step. At `MAX_FREE_HINTS` the solution is revealed.
pub fn stepwise_hint(
    question: &Question,
    step_number: u32,
    previous_attempts: u32,
) -> Result<HintDecision> {
    let step = step_at(question, step_number)?;

    if previous_attempts >= MAX_FREE_HINTS {
        return Ok(HintDecision {
            step_number,
            hint_level: HintLevel::Detailed,
            hint_text: Some(
                step.hints
                    .last()
                    .cloned()
                    .unwrap_or_else(|| REVEAL_FALLBACK_TEXT.to_string()),
            ),
            generation_guidance: None,
            should_reveal_solution: true,
            solution: Some(step.solution.clone()),
        });
    }

    let level = HintLevel::for_attempts(previous_attempts);
    let hint_text = step.hints.get(level.number() as usize - 1).cloned();
    let generation_guidance = match hint_text {
        Some(_) => None,
        None => Some(level.guidance().to_string()),
    };

    Ok(HintDecision {
        step_number,
        hint_level: level,
        hint_text,
        generation_guidance,
        should_reveal_solution: false,
        solution: None,
    })
}

/// Reveal the solution for one step only.
pub fn solve_step(question: &Question, step_number: u32) -> Result<StepSolution> {
    let step = step_at(question, step_number)?;
    let next_step_hint = question
        .steps
        .get(step_number as usize)
        .and_then(|next| next.hints.first().cloned());

    Ok(StepSolution {
        step_number,
        solution: step.solution.clone(),
        next_step_hint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionType, TopicKey, TopicMastery};
    use crate::profile::aggregate;
    use uuid::Uuid;

    fn question(steps: Vec<QuestionStep>) -> Question {
        Question {
            id: Uuid::nil(),
            title: "Two sum".into(),
            description: String::new(),
            topic: "Arrays".into(),
            subtopic: None,
            difficulty: Difficulty::Medium,
            question_type: QuestionType::MultiStep,
            steps,
            xp_reward: 10,
            tags: vec![],
        }
    }

    fn step(n: u32, hints: &[&str]) -> QuestionStep {
        QuestionStep {
            step_number: n,
            description: format!("step {n}"),
            expected_output: None,
            hints: hints.iter().map(|h| h.to_string()).collect(),
            solution: format!("solution {n}"),
        }
    }

    #[test]
    fn ladder_covers_unit_interval_monotonically() {
        assert_eq!(difficulty_for_mastery(0.0), Difficulty::Easy);
        assert_eq!(difficulty_for_mastery(0.29), Difficulty::Easy);
        assert_eq!(difficulty_for_mastery(0.3), Difficulty::Medium);
        assert_eq!(difficulty_for_mastery(0.6), Difficulty::Hard);
        assert_eq!(difficulty_for_mastery(0.85), Difficulty::Expert);
        assert_eq!(difficulty_for_mastery(1.0), Difficulty::Expert);

        let mut prev = Difficulty::Easy;
        for i in 0..=1000 {
            let d = difficulty_for_mastery(i as f64 / 1000.0);
            assert!(d >= prev);
            prev = d;
        }
    }

    #[test]
    fn next_difficulty_uses_topic_mastery() {
        let record = TopicMastery {
            mastery_probability: 0.9,
            total_attempts: 12,
            ..TopicMastery::new(TopicKey::new("Arrays", None))
        };
        let profile = aggregate(Uuid::nil(), &[record], &[]);
        assert_eq!(next_difficulty(&profile, "Arrays"), Difficulty::Expert);
        assert_eq!(next_difficulty(&profile, "Unseen"), Difficulty::Medium);
    }

    #[test]
    fn hints_escalate_then_reveal() {
        let q = question(vec![step(1, &["look at the ends", "use two pointers", "move the smaller"])]);

        let first = stepwise_hint(&q, 1, 0).unwrap();
        assert_eq!(first.hint_level, HintLevel::Subtle);
        assert_eq!(first.hint_text.as_deref(), Some("look at the ends"));
        assert!(!first.should_reveal_solution);

        let third = stepwise_hint(&q, 1, 2).unwrap();
        assert_eq!(third.hint_level, HintLevel::Detailed);
        assert_eq!(third.hint_text.as_deref(), Some("move the smaller"));
        assert!(third.solution.is_none());

        let reveal = stepwise_hint(&q, 1, 3).unwrap();
        assert!(reveal.should_reveal_solution);
        assert_eq!(reveal.hint_level, HintLevel::Detailed);
        assert_eq!(reveal.solution.as_deref(), Some("solution 1"));
        assert_eq!(reveal.hint_text.as_deref(), Some("move the smaller"));
    }

    #[test]
    fn missing_hint_carries_generation_guidance() {
        let q = question(vec![step(1, &["only one"])]);
        let decision = stepwise_hint(&q, 1, 1).unwrap();
        assert_eq!(decision.hint_level, HintLevel::Moderate);
        assert!(decision.hint_text.is_none());
        assert_eq!(
            decision.generation_guidance.as_deref(),
            Some(HintLevel::Moderate.guidance())
        );

        let bare = question(vec![step(1, &[])]);
        let reveal = stepwise_hint(&bare, 1, 7).unwrap();
        assert_eq!(reveal.hint_text.as_deref(), Some(REVEAL_FALLBACK_TEXT));
    }

    #[test]
    fn invalid_step_is_validation_error() {
        let q = question(vec![step(1, &[])]);
        assert!(matches!(
            stepwise_hint(&q, 2, 0),
            Err(MasteryError::Validation(_))
        ));
        assert!(stepwise_hint(&q, 0, 0).is_err());
        assert!(solve_step(&question(vec![]), 1).is_err());
    }

    #[test]
    fn solve_step_peeks_next_hint() {
        let q = question(vec![step(1, &[]), step(2, &["start from the left"])]);
        let first = solve_step(&q, 1).unwrap();
        assert_eq!(first.solution, "solution 1");
        assert_eq!(first.next_step_hint.as_deref(), Some("start from the left"));

        let last = solve_step(&q, 2).unwrap();
        assert!(last.next_step_hint.is_none());
    }
}
