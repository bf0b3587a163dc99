//! Attempt ingestion: read, compute, compare-and-swap, retry on conflict.
//!
//! The engine is pure; this is the caller that owns the read-modify-write
//! against the store. Batches run different topics concurrently but keep
//! attempts on the same (user, topic) in submission order, since the
//! learning rate depends on attempt order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use uuid::Uuid;

use mastery_core::engine::apply_attempt;
use mastery_core::model::{Attempt, AttemptRecord, Difficulty, TopicKey, TopicMastery};
use mastery_core::profile::{aggregate, UserMasteryProfile};
use mastery_core::statistics::{PerformanceSummary, RECENT_WINDOW};
use mastery_core::MasteryError;

use crate::error::StoreError;
use crate::store::MasteryStore;

/// Configuration for the ingestor.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Re-read/recompute rounds after a version conflict.
    pub max_retries: u32,
    /// Topic groups processed concurrently in a batch.
    pub parallelism: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_retries: 8,
            parallelism: 4,
        }
    }
}

/// An attempt waiting to be ingested, as it arrives on the wire, with the
/// question's XP reward. The difficulty stays a raw label until ingestion
/// so an unknown label fails only its own item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAttempt {
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub topic: String,
    #[serde(default)]
    pub subtopic: Option<String>,
    pub difficulty: String,
    pub is_correct: bool,
    pub time_taken_seconds: u32,
    #[serde(default = "default_xp")]
    pub xp_reward: u32,
}

impl PendingAttempt {
    pub fn new(attempt: Attempt, xp_reward: u32) -> Self {
        Self {
            user_id: attempt.user_id,
            question_id: attempt.question_id,
            topic: attempt.topic,
            subtopic: attempt.subtopic,
            difficulty: attempt.difficulty.as_str().to_string(),
            is_correct: attempt.is_correct,
            time_taken_seconds: attempt.time_taken_seconds,
            xp_reward,
        }
    }

    pub fn key(&self) -> TopicKey {
        TopicKey::new(self.topic.clone(), self.subtopic.clone())
    }

    /// Resolve the difficulty label; unknown labels are a configuration error.
    pub fn to_attempt(&self) -> Result<Attempt, MasteryError> {
        Ok(Attempt {
            user_id: self.user_id,
            question_id: self.question_id,
            topic: self.topic.clone(),
            subtopic: self.subtopic.clone(),
            difficulty: self.difficulty.parse::<Difficulty>()?,
            is_correct: self.is_correct,
            time_taken_seconds: self.time_taken_seconds,
        })
    }
}

fn default_xp() -> u32 {
    mastery_core::model::DEFAULT_XP_REWARD
}

/// Result of ingesting one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub mastery: TopicMastery,
    pub previous_mastery: f64,
    pub mastery_change: f64,
    pub xp_earned: u32,
    /// Store version the updated record was written at.
    pub version: u64,
}

/// A batch item that could not be ingested.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub index: usize,
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub error: String,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Successful outcomes in submission order.
    pub outcomes: Vec<AttemptOutcome>,
    pub failures: Vec<BatchFailure>,
    pub duration_ms: u64,
}

/// Applies attempts to a [`MasteryStore`].
pub struct AttemptIngestor {
    store: Arc<dyn MasteryStore>,
    config: IngestConfig,
}

impl AttemptIngestor {
    pub fn new(store: Arc<dyn MasteryStore>, config: IngestConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn MasteryStore> {
        &self.store
    }

    /// Ingest a single attempt.
    pub async fn ingest(
        &self,
        attempt: &Attempt,
        xp_reward: u32,
    ) -> Result<AttemptOutcome, StoreError> {
        let (outcome, record) = self.update_topic(attempt, xp_reward).await?;
        self.store.append_attempt(record).await?;
        Ok(outcome)
    }

    /// Compare-and-swap the topic record; the caller appends the history
    /// record that comes back.
    async fn update_topic(
        &self,
        attempt: &Attempt,
        xp_reward: u32,
    ) -> Result<(AttemptOutcome, AttemptRecord), StoreError> {
        attempt.validate()?;
        let key = attempt.key();

        let mut last_error = None;
        for retry in 0..=self.config.max_retries {
            if retry > 0 {
                tokio::task::yield_now().await;
            }

            let current = self.store.load_topic(attempt.user_id, &key).await?;
            let (record, version) = match current {
                Some(v) => (v.record, Some(v.version)),
                None => (TopicMastery::new(key.clone()), None),
            };

            let now = Utc::now();
            let next = apply_attempt(&record, attempt, now)?;

            match self
                .store
                .save_topic(attempt.user_id, next.clone(), version)
                .await
            {
                Ok(new_version) => {
                    let xp_earned = if attempt.is_correct { xp_reward } else { 0 };
                    let history = AttemptRecord {
                        user_id: attempt.user_id,
                        question_id: attempt.question_id,
                        topic: key.label(),
                        is_correct: attempt.is_correct,
                        time_taken_seconds: attempt.time_taken_seconds,
                        xp_earned,
                        created_at: now,
                    };

                    tracing::debug!(
                        "mastery for {}/{}: {:.4} -> {:.4} (v{})",
                        attempt.user_id,
                        key,
                        record.mastery_probability,
                        next.mastery_probability,
                        new_version
                    );

                    let outcome = AttemptOutcome {
                        user_id: attempt.user_id,
                        question_id: attempt.question_id,
                        previous_mastery: record.mastery_probability,
                        mastery_change: next.mastery_probability - record.mastery_probability,
                        mastery: next,
                        xp_earned,
                        version: new_version,
                    };
                    return Ok((outcome, history));
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!("{e}, retrying ({}/{})", retry + 1, self.config.max_retries);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| StoreError::Conflict {
            user_id: attempt.user_id,
            topic: key.label(),
            expected: None,
            found: None,
        }))
    }

    /// Ingest many attempts. Groups by (user, topic); groups run
    /// concurrently up to `parallelism`, items within a group in order.
    /// Attempt history is appended afterwards in submission order.
    pub async fn ingest_batch(&self, items: Vec<PendingAttempt>) -> BatchReport {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));

        let mut group_index: HashMap<(Uuid, TopicKey), usize> = HashMap::new();
        let mut groups: Vec<Vec<(usize, PendingAttempt)>> = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            let slot = *group_index
                .entry((item.user_id, item.key()))
                .or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
            groups[slot].push((index, item));
        }

        let mut futures = FuturesUnordered::new();
        for group in groups {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                let _permit = semaphore.acquire_owned().await;
                let mut results = Vec::with_capacity(group.len());
                for (index, item) in group {
                    let result = match item.to_attempt() {
                        Ok(attempt) => self.update_topic(&attempt, item.xp_reward).await,
                        Err(e) => Err(StoreError::from(e)),
                    };
                    results.push((index, item, result));
                }
                results
            });
        }

        let mut done = Vec::new();
        while let Some(results) = futures.next().await {
            done.extend(results);
        }
        done.sort_by_key(|(index, _, _)| *index);

        let mut outcomes = Vec::new();
        let mut failures = Vec::new();
        for (index, item, result) in done {
            let result = match result {
                Ok((outcome, history)) => self
                    .store
                    .append_attempt(history)
                    .await
                    .map(|()| outcome),
                Err(e) => Err(e),
            };
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!(
                        "attempt #{index} ({}/{}) failed: {e}",
                        item.user_id,
                        item.question_id
                    );
                    failures.push(BatchFailure {
                        index,
                        user_id: item.user_id,
                        question_id: item.question_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        let elapsed: Duration = start.elapsed();
        BatchReport {
            outcomes,
            failures,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// Recompute a user's profile from all stored topic records.
    pub async fn profile(
        &self,
        user_id: Uuid,
        known_topics: &[String],
    ) -> Result<UserMasteryProfile, StoreError> {
        let topics = self.store.list_topics(user_id).await?;
        Ok(aggregate(user_id, &topics, known_topics))
    }

    /// Summarize a user's recent performance.
    pub async fn performance(&self, user_id: Uuid) -> Result<PerformanceSummary, StoreError> {
        let recent = self.store.recent_attempts(user_id, RECENT_WINDOW).await?;
        Ok(PerformanceSummary::from_attempts(&recent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ContendedStore;
    use crate::store::InMemoryStore;
    use mastery_core::model::Difficulty;

    fn attempt(user: u128, topic: &str, difficulty: Difficulty, is_correct: bool) -> Attempt {
        Attempt {
            user_id: Uuid::from_u128(user),
            question_id: Uuid::from_u128(1000),
            topic: topic.into(),
            subtopic: None,
            difficulty,
            is_correct,
            time_taken_seconds: 20,
        }
    }

    fn ingestor(store: Arc<dyn MasteryStore>, max_retries: u32) -> AttemptIngestor {
        AttemptIngestor::new(
            store,
            IngestConfig {
                max_retries,
                parallelism: 4,
            },
        )
    }

    #[tokio::test]
    async fn first_attempt_creates_record_from_neutral() {
        let store = Arc::new(InMemoryStore::new());
        let ingestor = ingestor(store.clone(), 8);

        let outcome = ingestor
            .ingest(&attempt(1, "Arrays", Difficulty::Medium, true), 15)
            .await
            .unwrap();
        assert!((outcome.mastery.mastery_probability - 0.55).abs() < 1e-12);
        assert_eq!(outcome.previous_mastery, 0.5);
        assert!((outcome.mastery_change - 0.05).abs() < 1e-12);
        assert_eq!(outcome.xp_earned, 15);
        assert_eq!(outcome.version, 1);

        let history = store.recent_attempts(Uuid::from_u128(1), 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].xp_earned, 15);
    }

    #[tokio::test]
    async fn wrong_answer_earns_no_xp() {
        let ingestor = ingestor(Arc::new(InMemoryStore::new()), 8);
        let outcome = ingestor
            .ingest(&attempt(1, "Arrays", Difficulty::Easy, false), 15)
            .await
            .unwrap();
        assert_eq!(outcome.xp_earned, 0);
        assert!(outcome.mastery_change < 0.0);
    }

    #[tokio::test]
    async fn conflicts_are_retried() {
        let store = Arc::new(ContendedStore::new(3));
        let ingestor = ingestor(store.clone(), 8);

        let outcome = ingestor
            .ingest(&attempt(1, "Arrays", Difficulty::Hard, true), 10)
            .await
            .unwrap();
        assert_eq!(outcome.mastery.total_attempts, 1);
        assert_eq!(store.save_calls(), 4);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let store = Arc::new(ContendedStore::new(10));
        let ingestor = ingestor(store.clone(), 2);

        let err = ingestor
            .ingest(&attempt(1, "Arrays", Difficulty::Hard, true), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.save_calls(), 3);
        assert!(store.inner().list_topics(Uuid::from_u128(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_attempt_is_not_retried() {
        let store = Arc::new(ContendedStore::new(0));
        let ingestor = ingestor(store.clone(), 8);
        let err = ingestor
            .ingest(&attempt(1, "  ", Difficulty::Easy, true), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(_)));
        assert_eq!(store.save_calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_lose_no_updates() {
        let store: Arc<dyn MasteryStore> = Arc::new(InMemoryStore::new());
        // every conflict means another writer succeeded, so 50 writers
        // need at most 49 retries each
        let ingestor = Arc::new(ingestor(store.clone(), 64));

        let mut handles = Vec::new();
        for i in 0..50 {
            let ingestor = Arc::clone(&ingestor);
            handles.push(tokio::spawn(async move {
                let a = attempt(1, "Graphs", Difficulty::Medium, i % 2 == 0);
                ingestor.ingest(&a, 10).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let topics = store.list_topics(Uuid::from_u128(1)).await.unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].total_attempts, 50);
        assert_eq!(topics[0].correct_attempts, 25);
        assert_eq!(
            store.recent_attempts(Uuid::from_u128(1), 100).await.unwrap().len(),
            50
        );
    }

    #[tokio::test]
    async fn batch_keeps_per_topic_order() {
        let store: Arc<dyn MasteryStore> = Arc::new(InMemoryStore::new());
        let batch_ingestor = ingestor(store.clone(), 8);

        let sequence = [
            (true, Difficulty::Easy),
            (false, Difficulty::Hard),
            (true, Difficulty::Expert),
            (false, Difficulty::Easy),
        ];
        let mut items = Vec::new();
        for (is_correct, difficulty) in sequence {
            items.push(PendingAttempt::new(attempt(1, "Arrays", difficulty, is_correct), 10));
            items.push(PendingAttempt::new(attempt(2, "Trees", difficulty, !is_correct), 10));
        }
        items.push(PendingAttempt::new(attempt(2, "", Difficulty::Easy, true), 10));

        let report = batch_ingestor.ingest_batch(items).await;
        assert_eq!(report.outcomes.len(), 8);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 8);

        // replay sequentially against a fresh store
        let expected_store: Arc<dyn MasteryStore> = Arc::new(InMemoryStore::new());
        let sequential = ingestor(expected_store, 8);
        let mut last = None;
        for (is_correct, difficulty) in sequence {
            last = Some(
                sequential
                    .ingest(&attempt(1, "Arrays", difficulty, is_correct), 10)
                    .await
                    .unwrap(),
            );
        }
        let batch_arrays = store.list_topics(Uuid::from_u128(1)).await.unwrap();
        assert_eq!(
            batch_arrays[0].mastery_probability,
            last.unwrap().mastery.mastery_probability
        );

        let versions: Vec<u64> = report
            .outcomes
            .iter()
            .filter(|o| o.user_id == Uuid::from_u128(1))
            .map(|o| o.version)
            .collect();
        assert_eq!(versions, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn unknown_difficulty_fails_only_its_item() {
        let store: Arc<dyn MasteryStore> = Arc::new(InMemoryStore::new());
        let batch_ingestor = ingestor(store.clone(), 8);

        let mut bad = PendingAttempt::new(attempt(1, "Arrays", Difficulty::Easy, true), 10);
        bad.difficulty = "insane".into();
        let items = vec![
            PendingAttempt::new(attempt(1, "Arrays", Difficulty::Easy, true), 10),
            bad,
            PendingAttempt::new(attempt(1, "Arrays", Difficulty::Hard, true), 10),
        ];

        let report = batch_ingestor.ingest_batch(items).await;
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert!(report.failures[0]
            .error
            .contains("unknown difficulty label: insane"));

        let topics = store.list_topics(Uuid::from_u128(1)).await.unwrap();
        assert_eq!(topics[0].total_attempts, 2);
    }

    #[tokio::test]
    async fn batch_history_follows_submission_order() {
        let store: Arc<dyn MasteryStore> = Arc::new(InMemoryStore::new());
        let batch_ingestor = ingestor(store.clone(), 8);

        let topics = ["Arrays", "Trees", "Graphs", "Heaps"];
        let items: Vec<PendingAttempt> = (0..12u32)
            .map(|i| {
                let mut a = attempt(7, topics[i as usize % 4], Difficulty::Medium, true);
                a.question_id = Uuid::from_u128(i as u128);
                a.time_taken_seconds = i;
                PendingAttempt::new(a, 10)
            })
            .collect();

        let report = batch_ingestor.ingest_batch(items).await;
        assert!(report.failures.is_empty());

        let recent = store.recent_attempts(Uuid::from_u128(7), 12).await.unwrap();
        let seconds: Vec<u32> = recent.iter().map(|r| r.time_taken_seconds).collect();
        assert_eq!(seconds, (0..12u32).rev().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn profile_and_performance_from_store() {
        let ingestor = ingestor(Arc::new(InMemoryStore::new()), 8);
        for _ in 0..4 {
            ingestor
                .ingest(&attempt(5, "Arrays", Difficulty::Expert, true), 10)
                .await
                .unwrap();
        }
        for _ in 0..4 {
            ingestor
                .ingest(&attempt(5, "Graphs", Difficulty::Easy, false), 10)
                .await
                .unwrap();
        }

        let profile = ingestor
            .profile(Uuid::from_u128(5), &["Heaps".to_string()])
            .await
            .unwrap();
        assert_eq!(profile.topics.len(), 2);
        assert_eq!(profile.strengths, vec!["Arrays"]);
        assert_eq!(profile.weaknesses, vec!["Graphs"]);
        // weaknesses take priority over untouched topics
        assert_eq!(profile.recommended_topics, vec!["Graphs"]);

        let perf = ingestor.performance(Uuid::from_u128(5)).await.unwrap();
        assert_eq!(perf.sample_size, 8);
        assert!((perf.recent_accuracy - 0.5).abs() < 1e-12);
    }
}
