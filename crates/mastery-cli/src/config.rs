//! CLI configuration (`mastery.toml`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mastery_store::IngestConfig;

/// Top-level mastery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryConfig {
    /// JSON snapshot holding topic records and attempt history.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    /// Default assignment size.
    #[serde(default = "default_max_questions")]
    pub default_max_questions: usize,
    /// Max topics per assignment.
    #[serde(default = "default_max_topics")]
    pub max_topics: usize,
    /// Days until a generated assignment is due.
    #[serde(default = "default_due_days")]
    pub assignment_due_days: i64,
    /// Re-read/recompute rounds on a version conflict.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Topic groups ingested concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Fixed seed for assignment composition (random when unset).
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./mastery-state.json")
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
fn default_retries() -> u32 {
    8
}
fn default_parallelism() -> usize {
    4
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            default_max_questions: default_max_questions(),
            max_topics: default_max_topics(),
            assignment_due_days: default_due_days(),
            max_retries: default_retries(),
            parallelism: default_parallelism(),
            seed: None,
        }
    }
}

impl MasteryConfig {
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            max_retries: self.max_retries,
            parallelism: self.parallelism,
        }
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `mastery.toml` in the current directory
/// 2. `~/.config/mastery/config.toml`
///
/// Environment variable overrides: `MASTERY_STATE_PATH`, `MASTERY_SEED`.
pub fn load_config_from(path: Option<&Path>) -> Result<MasteryConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("mastery.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<MasteryConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => MasteryConfig::default(),
    };

    if let Ok(state) = std::env::var("MASTERY_STATE_PATH") {
        config.state_path = PathBuf::from(state);
    }
    if let Ok(seed) = std::env::var("MASTERY_SEED") {
        let seed = seed
            .parse::<u64>()
            .with_context(|| format!("MASTERY_SEED is not a number: {seed}"))?;
        config.seed = Some(seed);
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mastery"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_partial_config() {
        let config: MasteryConfig = toml::from_str(
            r#"
state_path = "data/state.json"
max_retries = 2
seed = 7
"#,
        )
        .unwrap();
        assert_eq!(config.state_path, PathBuf::from("data/state.json"));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.default_max_questions, 10);
        assert_eq!(config.parallelism, 4);
    }

    #[test]
    fn explicit_missing_path_fails() {
        let err = load_config_from(Some(Path::new("/nonexistent/mastery.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_path_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "max_topics = 2\nassignment_due_days = 3\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.max_topics, 2);
        assert_eq!(config.assignment_due_days, 3);
        assert_eq!(config.ingest_config().max_retries, 8);
    }
}
