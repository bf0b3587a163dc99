//! The `mastery complete` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use mastery_core::assignment::{Assignment, AssignmentStatus};

pub fn execute(path: PathBuf, question_id: Uuid, correct: bool, time: u32) -> Result<()> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read assignment: {}", path.display()))?;
    let mut assignment: Assignment = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse assignment: {}", path.display()))?;

    let now = Utc::now();
    if assignment.expire_if_overdue(now) {
        std::fs::write(&path, serde_json::to_string_pretty(&assignment)?)
            .with_context(|| format!("failed to write assignment: {}", path.display()))?;
        anyhow::bail!(
            "assignment {} expired on {}",
            assignment.id,
            assignment.due_date.format("%Y-%m-%d")
        );
    }
    assignment.complete_question(question_id, correct, time, now)?;
    std::fs::write(&path, serde_json::to_string_pretty(&assignment)?)
        .with_context(|| format!("failed to write assignment: {}", path.display()))?;

    let done = assignment.questions.iter().filter(|q| q.is_completed).count();
    match assignment.status {
        AssignmentStatus::Completed => println!(
            "Assignment completed: {} XP earned ({} bonus)",
            assignment.total_xp_earned, assignment.xp_bonus
        ),
        _ => println!(
            "Progress: {done}/{} questions",
            assignment.questions.len()
        ),
    }
    Ok(())
}
