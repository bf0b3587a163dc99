//! The `mastery profile` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use comfy_table::{Cell, Table};
use serde::Serialize;
use uuid::Uuid;

use mastery_core::policy::next_difficulty;
use mastery_core::profile::UserMasteryProfile;
use mastery_core::statistics::PerformanceSummary;
use mastery_store::AttemptIngestor;

use crate::config::load_config_from;

#[derive(Serialize)]
struct ProfileView<'a> {
    profile: &'a UserMasteryProfile,
    performance: &'a PerformanceSummary,
}

pub async fn execute(
    user: Uuid,
    bank: Option<PathBuf>,
    state: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let state_path = super::resolve_state_path(state, &config);

    let known_topics = match &bank {
        Some(path) => super::bank_topics(&super::load_banks(path)?),
        None => Vec::new(),
    };

    let store = Arc::new(super::open_store(&state_path)?);
    let ingestor = AttemptIngestor::new(store, config.ingest_config());
    let profile = ingestor.profile(user, &known_topics).await?;
    let performance = ingestor.performance(user).await?;

    match format.as_str() {
        "json" => {
            let view = ProfileView {
                profile: &profile,
                performance: &performance,
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        "markdown" | "md" => println!("{}", to_markdown(&profile)),
        _ => print_text(&profile, &performance),
    }

    Ok(())
}

fn print_text(profile: &UserMasteryProfile, performance: &PerformanceSummary) {
    println!("User: {}", profile.user_id);
    println!(
        "Overall mastery: {:.1}% ({} attempts)",
        profile.overall_mastery * 100.0,
        profile.total_attempts()
    );
    if performance.sample_size > 0 {
        println!(
            "Recent accuracy: {:.1}% over {} attempts, consistency {:.2}",
            performance.recent_accuracy * 100.0,
            performance.sample_size,
            performance.consistency
        );
    }

    if !profile.topics.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![
            "Topic",
            "Mastery",
            "Accuracy",
            "Attempts",
            "Avg Time",
            "Next",
        ]);
        for topic in &profile.topics {
            let label = topic.label();
            table.add_row(vec![
                Cell::new(&label),
                Cell::new(format!("{:.1}%", topic.mastery_probability * 100.0)),
                Cell::new(format!("{:.1}%", topic.accuracy() * 100.0)),
                Cell::new(topic.total_attempts),
                Cell::new(format!("{:.0}s", topic.average_time_seconds)),
                Cell::new(next_difficulty(profile, &label)),
            ]);
        }
        println!("\n{table}");
    }

    println!("\nStrengths: {}", list_or_none(&profile.strengths));
    println!("Weaknesses: {}", list_or_none(&profile.weaknesses));
    println!("Recommended: {}", list_or_none(&profile.recommended_topics));
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn to_markdown(profile: &UserMasteryProfile) -> String {
    let mut md = String::new();
    md.push_str(&format!("## Mastery profile for `{}`\n\n", profile.user_id));
    md.push_str(&format!(
        "**Overall mastery:** {:.1}%\n\n",
        profile.overall_mastery * 100.0
    ));

    if !profile.topics.is_empty() {
        md.push_str("| Topic | Mastery | Attempts | Correct |\n");
        md.push_str("|-------|---------|----------|---------|\n");
        for t in &profile.topics {
            md.push_str(&format!(
                "| {} | {:.1}% | {} | {} |\n",
                t.label(),
                t.mastery_probability * 100.0,
                t.total_attempts,
                t.correct_attempts
            ));
        }
        md.push('\n');
    }

    md.push_str(&format!("- **Strengths:** {}\n", list_or_none(&profile.strengths)));
    md.push_str(&format!("- **Weaknesses:** {}\n", list_or_none(&profile.weaknesses)));
    md.push_str(&format!(
        "- **Recommended:** {}\n",
        list_or_none(&profile.recommended_topics)
    ));
    md
}
