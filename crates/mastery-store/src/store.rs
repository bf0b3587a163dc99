//! Storage trait and the versioned in-memory implementation.
//!
//! Every topic record carries a version number. Writes are compare-and-swap
//! against the version the writer read, so two writers racing on the same
//! (user, topic) cannot silently overwrite each other.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use mastery_core::model::{AttemptRecord, TopicKey, TopicMastery};

use crate::error::StoreError;

/// A value together with the version it was stored at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

/// Persistence boundary for mastery state.
#[async_trait]
pub trait MasteryStore: Send + Sync {
    /// Load one topic record with its current version.
    async fn load_topic(
        &self,
        user_id: Uuid,
        key: &TopicKey,
    ) -> Result<Option<Versioned<TopicMastery>>, StoreError>;

    /// Write a topic record if its stored version still equals
    /// `expected_version` (`None` = the record must not exist yet).
    /// Returns the new version.
    async fn save_topic(
        &self,
        user_id: Uuid,
        record: TopicMastery,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError>;

    /// All topic records for a user.
    async fn list_topics(&self, user_id: Uuid) -> Result<Vec<TopicMastery>, StoreError>;

    /// Append to a user's attempt history.
    async fn append_attempt(&self, record: AttemptRecord) -> Result<(), StoreError>;

    /// Most recent attempts first, at most `limit`.
    async fn recent_attempts(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AttemptRecord>, StoreError>;

    /// Users with any stored state.
    async fn users(&self) -> Result<Vec<Uuid>, StoreError>;
}

#[derive(Debug, Default)]
struct UserState {
    topics: BTreeMap<TopicKey, Versioned<TopicMastery>>,
    attempts: Vec<AttemptRecord>,
}

/// In-memory store guarded by a `tokio::sync::RwLock`, with JSON snapshots.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, UserState>>,
}

/// On-disk snapshot format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub users: Vec<UserSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub user_id: Uuid,
    #[serde(default)]
    pub topics: Vec<Versioned<TopicMastery>>,
    /// Oldest first.
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot, validating every record.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        let mut users = HashMap::new();
        for user in snapshot.users {
            let mut state = UserState {
                topics: BTreeMap::new(),
                attempts: user.attempts,
            };
            for versioned in user.topics {
                versioned.record.validate()?;
                state.topics.insert(versioned.record.key(), versioned);
            }
            users.insert(user.user_id, state);
        }
        Ok(Self {
            users: RwLock::new(users),
        })
    }

    /// Capture the current state. Users are ordered by id for stable output.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let users = self.users.read().await;
        let mut out: Vec<UserSnapshot> = users
            .iter()
            .map(|(user_id, state)| UserSnapshot {
                user_id: *user_id,
                topics: state.topics.values().cloned().collect(),
                attempts: state.attempts.clone(),
            })
            .collect();
        out.sort_by_key(|u| u.user_id);
        StoreSnapshot { users: out }
    }

    /// Load a snapshot file; a missing file yields an empty store.
    pub fn load_json(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            tracing::info!("no state at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)?;
        Self::from_snapshot(snapshot)
    }

    /// Save the current state as pretty JSON.
    pub async fn save_json(&self, path: &Path) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.snapshot().await)?;
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        std::fs::write(path, json).map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl MasteryStore for InMemoryStore {
    async fn load_topic(
        &self,
        user_id: Uuid,
        key: &TopicKey,
    ) -> Result<Option<Versioned<TopicMastery>>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .get(&user_id)
            .and_then(|state| state.topics.get(key))
            .cloned())
    }

    async fn save_topic(
        &self,
        user_id: Uuid,
        record: TopicMastery,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        record.validate()?;
        let key = record.key();

        let mut users = self.users.write().await;
        let state = users.entry(user_id).or_default();
        let found = state.topics.get(&key).map(|v| v.version);

        if found != expected_version {
            return Err(StoreError::Conflict {
                user_id,
                topic: key.label(),
                expected: expected_version,
                found,
            });
        }

        let version = found.map_or(1, |v| v + 1);
        state.topics.insert(key, Versioned { version, record });
        Ok(version)
    }

    async fn list_topics(&self, user_id: Uuid) -> Result<Vec<TopicMastery>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .get(&user_id)
            .map(|state| state.topics.values().map(|v| v.record.clone()).collect())
            .unwrap_or_default())
    }

    async fn append_attempt(&self, record: AttemptRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        users
            .entry(record.user_id)
            .or_default()
            .attempts
            .push(record);
        Ok(())
    }

    async fn recent_attempts(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AttemptRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .get(&user_id)
            .map(|state| state.attempts.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn users(&self) -> Result<Vec<Uuid>, StoreError> {
        let users = self.users.read().await;
        let mut ids: Vec<Uuid> = users.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}
