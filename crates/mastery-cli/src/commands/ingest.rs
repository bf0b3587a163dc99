//! The `mastery ingest` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use mastery_store::{AttemptIngestor, BatchReport, PendingAttempt};

use crate::config::load_config_from;

pub async fn execute(
    attempts_path: PathBuf,
    bank: Option<PathBuf>,
    state: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let state_path = super::resolve_state_path(state, &config);

    let content = std::fs::read_to_string(&attempts_path)
        .with_context(|| format!("failed to read attempts: {}", attempts_path.display()))?;
    let mut pending: Vec<PendingAttempt> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse attempts: {}", attempts_path.display()))?;

    // The bank is authoritative for XP rewards.
    if let Some(bank_path) = &bank {
        let banks = super::load_banks(bank_path)?;
        for item in &mut pending {
            if let Ok(question) = super::find_question(&banks, item.question_id) {
                item.xp_reward = question.xp_reward;
            } else {
                tracing::warn!(
                    "question {} not in bank, using default XP",
                    item.question_id
                );
            }
        }
    }

    let store = Arc::new(super::open_store(&state_path)?);
    let ingestor = AttemptIngestor::new(store.clone(), config.ingest_config());

    tracing::info!("ingesting {} attempt(s)", pending.len());
    let report = ingestor.ingest_batch(pending).await;

    store.save_json(&state_path).await.with_context(|| {
        format!("failed to save state: {}", state_path.display())
    })?;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_report(&report),
    }

    if !report.failures.is_empty() {
        anyhow::bail!("{} attempt(s) failed", report.failures.len());
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    let mut table = Table::new();
    table.set_header(vec!["User", "Topic", "Mastery", "Change", "Attempts", "XP"]);

    for outcome in &report.outcomes {
        table.add_row(vec![
            Cell::new(outcome.user_id),
            Cell::new(outcome.mastery.label()),
            Cell::new(format!(
                "{:.3} -> {:.3}",
                outcome.previous_mastery, outcome.mastery.mastery_probability
            )),
            Cell::new(format!("{:+.3}", outcome.mastery_change)),
            Cell::new(outcome.mastery.total_attempts),
            Cell::new(outcome.xp_earned),
        ]);
    }

    println!("{table}");
    for failure in &report.failures {
        println!("  FAILED #{}: {}", failure.index, failure.error);
    }
    println!(
        "\nIngested {} attempt(s), {} failed ({}ms)",
        report.outcomes.len(),
        report.failures.len(),
        report.duration_ms
    );
}
