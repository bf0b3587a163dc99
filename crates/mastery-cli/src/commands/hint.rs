//! The `mastery hint` and `mastery solve-step` commands.

use std::path::PathBuf;

use anyhow::Result;
use uuid::Uuid;

use mastery_core::policy::{solve_step, stepwise_hint};

pub fn execute(
    bank: PathBuf,
    question_id: Uuid,
    step: u32,
    previous_attempts: u32,
    format: String,
) -> Result<()> {
    let banks = super::load_banks(&bank)?;
    let question = super::find_question(&banks, question_id)?;
    let decision = stepwise_hint(question, step, previous_attempts)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    println!(
        "{} (step {}/{}), hint level {}",
        question.title,
        decision.step_number,
        question.steps.len(),
        decision.hint_level.number()
    );
    if let Some(text) = &decision.hint_text {
        println!("Hint: {text}");
    }
    if let Some(guidance) = &decision.generation_guidance {
        println!("No predefined hint. Generator guidance: {guidance}");
    }
    if let Some(solution) = &decision.solution {
        println!("Solution: {solution}");
    }

    Ok(())
}

pub fn execute_solve(bank: PathBuf, question_id: Uuid, step: u32) -> Result<()> {
    let banks = super::load_banks(&bank)?;
    let question = super::find_question(&banks, question_id)?;
    let solved = solve_step(question, step)?;

    println!("Step {} solution: {}", solved.step_number, solved.solution);
    if let Some(next) = &solved.next_step_hint {
        println!("Next step hint: {next}");
    }
    Ok(())
}
