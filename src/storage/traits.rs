//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::api::{Match, Summoner};
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StorageError::ConstraintViolation(
                    message.unwrap_or_else(|| "constraint failed".to_string()),
                )
            }
            other => StorageError::Sqlite(other),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This is the persistence collaborator of the crawl: workers hand it every
/// newly crawled match and player profile. Implementations are shared
/// behind a mutex, so methods take `&mut self` freely.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `start_player` - Summoner name the run starts from
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, start_player: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with its final counts
    fn complete_run(&mut self, run_id: i64, matches: u64, players: u64) -> StorageResult<()>;

    // ===== Documents =====

    /// Stores a match document
    ///
    /// Fails with `ConstraintViolation` if the match is already stored.
    fn insert_match(&mut self, run_id: i64, record: &Match) -> StorageResult<()>;

    /// Stores a player profile
    ///
    /// Fails with `ConstraintViolation` if the player is already stored.
    fn insert_player(&mut self, run_id: i64, profile: &Summoner) -> StorageResult<()>;

    // ===== Statistics =====

    /// Counts stored matches
    fn count_matches(&self) -> StorageResult<u64>;

    /// Counts stored player profiles
    fn count_players(&self) -> StorageResult<u64>;

    /// Counts distinct participants across all stored matches
    fn count_distinct_participants(&self) -> StorageResult<u64>;

    /// Counts crawl runs
    fn count_runs(&self) -> StorageResult<u64>;
}
