//! Store wrapper that simulates a competing writer, for testing retries.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use mastery_core::model::{AttemptRecord, TopicKey, TopicMastery};

use crate::error::StoreError;
use crate::store::{InMemoryStore, MasteryStore, Versioned};

/// Wraps an [`InMemoryStore`] and rejects the first `conflicts` topic
/// writes with a version conflict, as if another writer got there first.
pub struct ContendedStore {
    inner: InMemoryStore,
    remaining_conflicts: AtomicU32,
    save_calls: AtomicU32,
}

impl ContendedStore {
    pub fn new(conflicts: u32) -> Self {
        Self {
            inner: InMemoryStore::new(),
            remaining_conflicts: AtomicU32::new(conflicts),
            save_calls: AtomicU32::new(0),
        }
    }

    /// Number of `save_topic` calls made, including rejected ones.
    pub fn save_calls(&self) -> u32 {
        self.save_calls.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }
}

#[async_trait]
impl MasteryStore for ContendedStore {
    async fn load_topic(
        &self,
        user_id: Uuid,
        key: &TopicKey,
    ) -> Result<Option<Versioned<TopicMastery>>, StoreError> {
        self.inner.load_topic(user_id, key).await
    }

    async fn save_topic(
        &self,
        user_id: Uuid,
        record: TopicMastery,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        self.save_calls.fetch_add(1, Ordering::Relaxed);
        let injected = self
            .remaining_conflicts
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Conflict {
                user_id,
                topic: record.label(),
                expected: expected_version,
                found: Some(expected_version.map_or(1, |v| v + 1)),
            });
        }
        self.inner.save_topic(user_id, record, expected_version).await
    }

    async fn list_topics(&self, user_id: Uuid) -> Result<Vec<TopicMastery>, StoreError> {
        self.inner.list_topics(user_id).await
    }

    async fn append_attempt(&self, record: AttemptRecord) -> Result<(), StoreError> {
        self.inner.append_attempt(record).await
    }

    async fn recent_attempts(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AttemptRecord>, StoreError> {
        self.inner.recent_attempts(user_id, limit).await
    }

    async fn users(&self) -> Result<Vec<Uuid>, StoreError> {
        self.inner.users().await
    }
}
