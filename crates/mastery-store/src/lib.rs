//! Versioned storage for mastery records and the ingestion loop that
//! applies attempts to it under concurrent writers.

pub mod error;
pub mod ingest;
pub mod mock;
pub mod store;

pub use error::StoreError;
pub use ingest::{AttemptIngestor, AttemptOutcome, BatchReport, IngestConfig, PendingAttempt};
pub use store::{InMemoryStore, MasteryStore, StoreSnapshot, Versioned};
