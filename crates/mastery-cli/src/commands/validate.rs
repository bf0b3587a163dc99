//! The `mastery validate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use mastery_core::parser::validate_question_bank;
use mastery_store::MasteryStore;

pub async fn execute(bank: Option<PathBuf>, state: Option<PathBuf>) -> Result<()> {
    anyhow::ensure!(
        bank.is_some() || state.is_some(),
        "nothing to validate: pass --bank and/or --state"
    );

    let mut total_warnings = 0;

    if let Some(bank_path) = &bank {
        let banks = super::load_banks(bank_path)?;
        for b in &banks {
            println!("Question bank: {} ({} questions)", b.name, b.questions.len());

            let warnings = validate_question_bank(b);
            for w in &warnings {
                let prefix = w
                    .question_id
                    .as_ref()
                    .map(|id| format!("  [{id}]"))
                    .unwrap_or_else(|| "  ".to_string());
                println!("{prefix} WARNING: {}", w.message);
            }
            total_warnings += warnings.len();
        }
    }

    if let Some(state_path) = &state {
        anyhow::ensure!(
            state_path.exists(),
            "state file not found: {}",
            state_path.display()
        );
        // Loading checks every record's invariants.
        let store = super::open_store(state_path)?;
        let users = store
            .users()
            .await
            .with_context(|| format!("failed to read state: {}", state_path.display()))?;
        println!("State: {} ({} users)", state_path.display(), users.len());
    }

    if total_warnings == 0 {
        println!("All inputs valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
