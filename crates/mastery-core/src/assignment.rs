//! Personalized assignment generation and completion tracking.
//!
//! Composition is deterministic given its inputs; the only randomness
//! (which concrete questions fill the topic slots, and the assignment id)
//! comes from the caller's `Rng`, so a seeded generator reproduces an
//! assignment exactly.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MasteryError, Result};
use crate::model::{Difficulty, Question};
use crate::policy::difficulty_for_mastery;
use crate::profile::UserMasteryProfile;
use crate::statistics::PerformanceSummary;

/// XP awarded per correctly answered assignment question.
pub const XP_PER_CORRECT_QUESTION: u32 = 10;

/// Extra bonus XP per question in the assignment.
pub const XP_BONUS_PER_QUESTION: u32 = 5;

/// Topic used when the profile offers nothing to work on.
pub const FALLBACK_TOPIC: &str = "fundamentals";

const WEAKNESS_TOPICS: usize = 3;
const STRENGTH_TOPICS: usize = 2;

/// What an assignment is meant to achieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    Practice,
    Reinforcement,
    Challenge,
    Review,
}

impl AssignmentType {
    /// Choose a type from the profile and recent performance.
    pub fn determine(profile: &UserMasteryProfile, performance: &PerformanceSummary) -> Self {
        if !profile.weaknesses.is_empty() && performance.recent_accuracy < 0.5 {
            AssignmentType::Reinforcement
        } else if performance.recent_accuracy > 0.8 {
            AssignmentType::Challenge
        } else if profile.overall_mastery > 0.7 {
            AssignmentType::Review
        } else {
            AssignmentType::Practice
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AssignmentType::Practice => "Practice Session",
            AssignmentType::Reinforcement => "Skill Reinforcement",
            AssignmentType::Challenge => "Challenge Assignment",
            AssignmentType::Review => "Review & Consolidation",
        }
    }

    fn description(self, topics: &str) -> String {
        match self {
            AssignmentType::Practice => {
                format!("Regular practice to build your skills in {topics}.")
            }
            AssignmentType::Reinforcement => {
                format!("These exercises will help strengthen your understanding of {topics}.")
            }
            AssignmentType::Challenge => {
                format!("Push your limits with these challenging problems in {topics}!")
            }
            AssignmentType::Review => format!("Review and consolidate your knowledge of {topics}."),
        }
    }

    /// Base XP bonus before the per-question part.
    pub fn base_xp_bonus(self) -> u32 {
        match self {
            AssignmentType::Practice => 20,
            AssignmentType::Reinforcement => 30,
            AssignmentType::Challenge => 50,
            AssignmentType::Review => 25,
        }
    }
}

impl fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssignmentType::Practice => "practice",
            AssignmentType::Reinforcement => "reinforcement",
            AssignmentType::Challenge => "challenge",
            AssignmentType::Review => "review",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    InProgress,
    Completed,
    Expired,
}

/// Inputs controlling assignment generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentCriteria {
    pub user_id: Uuid,
    #[serde(default = "default_true")]
    pub focus_on_weaknesses: bool,
    #[serde(default)]
    pub include_strengths: bool,
    /// Overrides the per-topic difficulty ladder.
    #[serde(default)]
    pub target_difficulty: Option<Difficulty>,
    #[serde(default = "default_max_questions")]
    pub max_questions: usize,
    #[serde(default = "default_max_topics")]
    pub max_topics: usize,
    /// Explicit topics; skips profile-based selection.
    #[serde(default)]
    pub topics: Option<Vec<String>>,
    #[serde(default = "default_due_days")]
    pub due_days: i64,
}

fn default_true() -> bool {
    true
}
fn default_max_questions() -> usize {
    10
}
fn default_max_topics() -> usize {
    5
}
fn default_due_days() -> i64 {
    7
}

impl AssignmentCriteria {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id,
            focus_on_weaknesses: true,
            include_strengths: false,
            target_difficulty: None,
            max_questions: default_max_questions(),
            max_topics: default_max_topics(),
            topics: None,
            due_days: default_due_days(),
        }
    }
}

/// A topic slot and the difficulty it should be served at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSlot {
    pub topic: String,
    pub difficulty: Difficulty,
}

/// A question the generator may place into a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCandidate {
    pub id: Uuid,
    pub topic: String,
    #[serde(default)]
    pub subtopic: Option<String>,
    pub difficulty: Difficulty,
}

impl From<&Question> for QuestionCandidate {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            topic: q.topic.clone(),
            subtopic: q.subtopic.clone(),
            difficulty: q.difficulty,
        }
    }
}

impl QuestionCandidate {
    fn fits(&self, slot: &TopicSlot) -> bool {
        if self.difficulty != slot.difficulty {
            return false;
        }
        match &self.subtopic {
            Some(sub) => self.topic == slot.topic || format!("{}/{}", self.topic, sub) == slot.topic,
            None => self.topic == slot.topic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentQuestion {
    pub question_id: Uuid,
    /// 1-based position within the assignment.
    pub order: u32,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub time_taken_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub assignment_type: AssignmentType,
    pub target_topics: Vec<TopicSlot>,
    pub questions: Vec<AssignmentQuestion>,
    pub status: AssignmentStatus,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_xp_earned: u32,
    pub xp_bonus: u32,
}

/// Pick target topics: explicit topics win, otherwise weaknesses first,
/// then recommended topics, then (optionally) strengths.
pub fn select_topics(criteria: &AssignmentCriteria, profile: &UserMasteryProfile) -> Vec<String> {
    let mut picked: Vec<String> = Vec::new();
    let mut push = |topic: &String| {
        if !picked.contains(topic) {
            picked.push(topic.clone());
        }
    };

    match &criteria.topics {
        Some(explicit) if !explicit.is_empty() => explicit.iter().for_each(&mut push),
        _ => {
            if criteria.focus_on_weaknesses {
                profile
                    .weaknesses
                    .iter()
                    .take(WEAKNESS_TOPICS)
                    .for_each(&mut push);
            }
            profile.recommended_topics.iter().for_each(&mut push);
            if criteria.include_strengths {
                profile
                    .strengths
                    .iter()
                    .take(STRENGTH_TOPICS)
                    .for_each(&mut push);
            }
        }
    }

    picked.truncate(criteria.max_topics.max(1));
    if picked.is_empty() {
        picked.push(FALLBACK_TOPIC.to_string());
    }
    picked
}

/// Attach a difficulty to each topic.
pub fn plan_slots(
    topics: &[String],
    profile: &UserMasteryProfile,
    target: Option<Difficulty>,
) -> Vec<TopicSlot> {
    topics
        .iter()
        .map(|topic| TopicSlot {
            topic: topic.clone(),
            difficulty: target.unwrap_or_else(|| difficulty_for_mastery(profile.mastery_for(topic))),
        })
        .collect()
}

/// Fill slots from the candidate pool: unattempted questions first, then
/// previously attempted ones, in an order shuffled by `rng`.
pub fn select_questions<R: Rng>(
    slots: &[TopicSlot],
    candidates: &[QuestionCandidate],
    attempted: &HashSet<Uuid>,
    count: usize,
    rng: &mut R,
) -> Vec<AssignmentQuestion> {
    let mut matching: Vec<&QuestionCandidate> = candidates
        .iter()
        .filter(|c| slots.iter().any(|s| c.fits(s)))
        .collect();
    matching.shuffle(rng);

    let mut seen = HashSet::new();
    let (fresh, repeat): (Vec<_>, Vec<_>) = matching
        .into_iter()
        .filter(|c| seen.insert(c.id))
        .partition(|c| !attempted.contains(&c.id));

    fresh
        .into_iter()
        .chain(repeat)
        .take(count)
        .enumerate()
        .map(|(i, c)| AssignmentQuestion {
            question_id: c.id,
            order: i as u32 + 1,
            is_completed: false,
            is_correct: None,
            time_taken_seconds: None,
        })
        .collect()
}

fn title_for(kind: AssignmentType, topics: &[String]) -> String {
    let mut topic_str = topics
        .iter()
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if topics.len() > 2 {
        topic_str.push_str(&format!(" (+{} more)", topics.len() - 2));
    }
    format!("{}: {}", kind.title(), topic_str)
}

/// Generate a personalized assignment.
pub fn generate_assignment<R: Rng>(
    criteria: &AssignmentCriteria,
    profile: &UserMasteryProfile,
    performance: &PerformanceSummary,
    candidates: &[QuestionCandidate],
    attempted: &HashSet<Uuid>,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<Assignment> {
    if criteria.max_questions == 0 {
        return Err(MasteryError::Validation(
            "max_questions must be at least 1".into(),
        ));
    }
    if criteria.due_days < 0 {
        return Err(MasteryError::Validation(format!(
            "due_days must not be negative (got {})",
            criteria.due_days
        )));
    }
    if criteria.user_id != profile.user_id {
        return Err(MasteryError::Validation(format!(
            "criteria for user {} paired with profile of user {}",
            criteria.user_id, profile.user_id
        )));
    }
    let due_date = Duration::try_days(criteria.due_days)
        .and_then(|span| now.checked_add_signed(span))
        .ok_or_else(|| {
            MasteryError::Validation(format!(
                "due_days {} is out of range",
                criteria.due_days
            ))
        })?;

    let kind = AssignmentType::determine(profile, performance);
    let topics = select_topics(criteria, profile);
    let slots = plan_slots(&topics, profile, criteria.target_difficulty);
    let questions = select_questions(&slots, candidates, attempted, criteria.max_questions, rng);

    if questions.len() < criteria.max_questions {
        tracing::debug!(
            "assignment for {} filled {}/{} questions",
            criteria.user_id,
            questions.len(),
            criteria.max_questions
        );
    }

    let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
    let xp_bonus = kind.base_xp_bonus() + XP_BONUS_PER_QUESTION * questions.len() as u32;

    Ok(Assignment {
        id,
        user_id: criteria.user_id,
        title: title_for(kind, &topics),
        description: kind.description(&topics.join(", ")),
        assignment_type: kind,
        target_topics: slots,
        questions,
        status: AssignmentStatus::Pending,
        due_date,
        created_at: now,
        completed_at: None,
        total_xp_earned: 0,
        xp_bonus,
    })
}

impl Assignment {
    /// Record the result for one question and advance the status.
    pub fn complete_question(
        &mut self,
        question_id: Uuid,
        is_correct: bool,
        time_taken_seconds: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status == AssignmentStatus::Completed {
            return Err(MasteryError::Validation(format!(
                "assignment {} is already completed",
                self.id
            )));
        }
        if self.status == AssignmentStatus::Expired {
            return Err(MasteryError::Validation(format!(
                "assignment {} has expired",
                self.id
            )));
        }

        let question = self
            .questions
            .iter_mut()
            .find(|q| q.question_id == question_id)
            .ok_or_else(|| {
                MasteryError::Validation(format!(
                    "question {question_id} is not part of assignment {}",
                    self.id
                ))
            })?;
        question.is_completed = true;
        question.is_correct = Some(is_correct);
        question.time_taken_seconds = Some(time_taken_seconds);

        if self.questions.iter().all(|q| q.is_completed) {
            let correct = self
                .questions
                .iter()
                .filter(|q| q.is_correct == Some(true))
                .count() as u32;
            self.status = AssignmentStatus::Completed;
            self.completed_at = Some(now);
            self.total_xp_earned = correct * XP_PER_CORRECT_QUESTION + self.xp_bonus;
        } else {
            self.status = AssignmentStatus::InProgress;
        }
        Ok(())
    }

    /// Mark an unfinished assignment past its due date as expired.
    /// Returns `true` if the status changed.
    pub fn expire_if_overdue(&mut self, now: DateTime<Utc>) -> bool {
        let open = matches!(
            self.status,
            AssignmentStatus::Pending | AssignmentStatus::InProgress
        );
        if open && now > self.due_date {
            self.status = AssignmentStatus::Expired;
            true
        } else {
            false
        }
    }
}
