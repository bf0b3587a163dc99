//! Adaptive mastery tracking engine.
//!
//! Pure, synchronous building blocks: the mastery update recurrence, profile
//! aggregation, and the hint/assignment policies that consume a profile.
//! Nothing in this crate performs I/O against a store; callers pass
//! snapshots in and persist the snapshots that come back.

pub mod assignment;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod policy;
pub mod profile;
pub mod statistics;

pub use error::MasteryError;
