//! The `mastery assign` command.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use comfy_table::{Cell, Table};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use mastery_core::assignment::{generate_assignment, Assignment, AssignmentCriteria, QuestionCandidate};
use mastery_core::model::Difficulty;
use mastery_core::parser::QuestionBank;
use mastery_store::{AttemptIngestor, MasteryStore};

use crate::config::load_config_from;

pub struct AssignArgs {
    pub user: Uuid,
    pub bank: PathBuf,
    pub state: Option<PathBuf>,
    pub max_questions: Option<usize>,
    pub topics: Option<String>,
    pub target_difficulty: Option<String>,
    pub include_strengths: bool,
    pub seed: Option<u64>,
    pub output: Option<PathBuf>,
    pub format: String,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: AssignArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;
    let state_path = super::resolve_state_path(args.state, &config);

    let banks = super::load_banks(&args.bank)?;
    let candidates: Vec<QuestionCandidate> = banks
        .iter()
        .flat_map(|b| b.questions.iter().map(QuestionCandidate::from))
        .collect();
    anyhow::ensure!(
        !candidates.is_empty(),
        "no questions found in {}",
        args.bank.display()
    );

    let store = Arc::new(super::open_store(&state_path)?);
    let attempted: HashSet<Uuid> = store
        .recent_attempts(args.user, usize::MAX)
        .await?
        .into_iter()
        .map(|a| a.question_id)
        .collect();

    let ingestor = AttemptIngestor::new(store, config.ingest_config());
    let profile = ingestor.profile(args.user, &super::bank_topics(&banks)).await?;
    let performance = ingestor.performance(args.user).await?;

    let mut criteria = AssignmentCriteria::for_user(args.user);
    criteria.max_questions = args.max_questions.unwrap_or(config.default_max_questions);
    criteria.max_topics = config.max_topics;
    criteria.due_days = config.assignment_due_days;
    criteria.include_strengths = args.include_strengths;
    criteria.target_difficulty = args
        .target_difficulty
        .as_deref()
        .map(str::parse::<Difficulty>)
        .transpose()?;
    criteria.topics = args.topics.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    });

    let seed = args.seed.or(config.seed).unwrap_or_else(rand::random);
    tracing::info!("composing assignment for {} with seed {seed}", args.user);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let assignment = generate_assignment(
        &criteria,
        &profile,
        &performance,
        &candidates,
        &attempted,
        &mut rng,
        Utc::now(),
    )?;

    if let Some(output) = &args.output {
        let json = serde_json::to_string_pretty(&assignment)?;
        std::fs::write(output, json)
            .with_context(|| format!("failed to write assignment: {}", output.display()))?;
        eprintln!("Assignment written to {}", output.display());
    }

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&assignment)?),
        _ => print_assignment(&assignment, &banks),
    }

    Ok(())
}

fn print_assignment(assignment: &Assignment, banks: &[QuestionBank]) {
    println!("{}", assignment.title);
    println!("{}", assignment.description);
    println!(
        "Type: {}, due {}, bonus {} XP",
        assignment.assignment_type,
        assignment.due_date.format("%Y-%m-%d"),
        assignment.xp_bonus
    );

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Topic", "Difficulty"]);
    for q in &assignment.questions {
        let row = match super::find_question(banks, q.question_id) {
            Ok(question) => vec![
                Cell::new(q.order),
                Cell::new(&question.title),
                Cell::new(&question.topic),
                Cell::new(question.difficulty),
            ],
            Err(_) => vec![
                Cell::new(q.order),
                Cell::new(q.question_id),
                Cell::new("-"),
                Cell::new("-"),
            ],
        };
        table.add_row(row);
    }
    println!("\n{table}");

    if assignment.questions.is_empty() {
        println!("No questions matched the selected topics and difficulties.");
    }
}
