pub mod assign;
pub mod complete;
pub mod hint;
pub mod ingest;
pub mod init;
pub mod profile;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

use mastery_core::model::Question;
use mastery_core::parser::{self, QuestionBank};
use mastery_store::InMemoryStore;

use crate::config::MasteryConfig;

/// `--state` wins over the configured path.
fn resolve_state_path(state: Option<PathBuf>, config: &MasteryConfig) -> PathBuf {
    state.unwrap_or_else(|| config.state_path.clone())
}

fn open_store(path: &Path) -> Result<InMemoryStore> {
    InMemoryStore::load_json(path)
        .with_context(|| format!("failed to load state: {}", path.display()))
}

fn load_banks(path: &Path) -> Result<Vec<QuestionBank>> {
    parser::load_banks(path)
        .with_context(|| format!("failed to load question bank: {}", path.display()))
}

fn find_question(banks: &[QuestionBank], id: Uuid) -> Result<&Question> {
    banks
        .iter()
        .find_map(|b| b.question(id))
        .ok_or_else(|| anyhow::anyhow!("question {id} not found"))
}

/// Distinct topics across banks, in bank order.
fn bank_topics(banks: &[QuestionBank]) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for topic in banks.iter().flat_map(|b| b.topics()) {
        if !topics.contains(&topic) {
            topics.push(topic);
        }
    }
    topics
}
