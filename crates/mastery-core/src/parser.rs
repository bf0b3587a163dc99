//! TOML question bank parser.
//!
//! Loads question banks from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Difficulty, Question, QuestionStep, QuestionType, DEFAULT_XP_REWARD};

/// A named collection of questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionBank {
    /// Distinct topic labels in bank order.
    pub fn topics(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.questions
            .iter()
            .map(|q| q.topic.clone())
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    pub fn question(&self, id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// Intermediate TOML structure for parsing question bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_difficulty_str")]
    default_difficulty: String,
}

fn default_difficulty_str() -> String {
    "medium".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: Uuid,
    title: String,
    #[serde(default)]
    description: String,
    topic: String,
    #[serde(default)]
    subtopic: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default = "default_question_type_str")]
    question_type: String,
    #[serde(default)]
    xp_reward: Option<u32>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    steps: Vec<TomlStep>,
}

fn default_question_type_str() -> String {
    "short_answer".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlStep {
    step_number: u32,
    description: String,
    #[serde(default)]
    expected_output: Option<String>,
    #[serde(default)]
    hints: Vec<String>,
    solution: String,
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_question_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_question_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank`.
pub fn parse_question_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let default_difficulty: Difficulty = parsed.bank.default_difficulty.parse()?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let difficulty = q
                .difficulty
                .map(|d| d.parse::<Difficulty>())
                .transpose()
                .with_context(|| format!("question {}", q.id))?
                .unwrap_or(default_difficulty);

            let question_type: QuestionType = q
                .question_type
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?;

            let steps = q
                .steps
                .into_iter()
                .map(|s| QuestionStep {
                    step_number: s.step_number,
                    description: s.description,
                    expected_output: s.expected_output,
                    hints: s.hints,
                    solution: s.solution,
                })
                .collect();

            Ok(Question {
                id: q.id,
                title: q.title,
                description: q.description,
                topic: q.topic,
                subtopic: q.subtopic,
                difficulty,
                question_type,
                steps,
                xp_reward: q.xp_reward.unwrap_or(DEFAULT_XP_REWARD),
                tags: q.tags,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuestionBank {
        id: parsed.bank.id,
        name: parsed.bank.name,
        description: parsed.bank.description,
        questions,
    })
}

/// Recursively load all `.toml` question banks from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_question_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a single bank file, or every bank under a directory.
pub fn load_banks(path: &Path) -> Result<Vec<QuestionBank>> {
    if path.is_dir() {
        load_bank_directory(path)
    } else {
        Ok(vec![parse_question_bank(path)?])
    }
}

/// A warning from question bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<Uuid>,
    pub message: String,
}

/// Validate a question bank for common authoring issues.
pub fn validate_question_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = HashSet::new();
    for q in &bank.questions {
        if !seen_ids.insert(q.id) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: format!("duplicate question ID: {}", q.id),
            });
        }
    }

    for q in &bank.questions {
        if q.topic.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: "topic is empty".into(),
            });
        }

        if q.question_type == QuestionType::MultiStep && q.steps.is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: "multi_step question has no steps".into(),
            });
        }

        for (i, step) in q.steps.iter().enumerate() {
            if step.step_number as usize != i + 1 {
                warnings.push(ValidationWarning {
                    question_id: Some(q.id),
                    message: format!(
                        "step {} is at position {}; steps must be numbered from 1 in order",
                        step.step_number,
                        i + 1
                    ),
                });
            }
            if step.hints.is_empty() {
                warnings.push(ValidationWarning {
                    question_id: Some(q.id),
                    message: format!("step {} has no hints", step.step_number),
                });
            }
        }
    }

    warnings
}
