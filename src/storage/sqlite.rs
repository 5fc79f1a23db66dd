//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Matches and players are stored as JSON documents next to a handful of
//! indexed columns.

use crate::api::{Match, Summoner};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Reads the stored document of a match
    pub fn get_match_document(&self, match_id: &str) -> StorageResult<Option<Match>> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM matches WHERE match_id = ?1",
                params![match_id],
                |row| row.get(0),
            )
            .optional()?;

        match document {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Reads the stored profile of a player
    pub fn get_player(&self, puuid: &str) -> StorageResult<Option<Summoner>> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM players WHERE puuid = ?1",
                params![puuid],
                |row| row.get(0),
            )
            .optional()?;

        match document {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// All stored match ids, sorted
    pub fn match_ids(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT match_id FROM matches ORDER BY match_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// All stored player ids, sorted
    pub fn player_ids(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT puuid FROM players ORDER BY puuid")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, start_player, status, \
                           matches_crawled, players_crawled";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        start_player: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Running),
        matches_crawled: row.get::<_, Option<i64>>(6)?.map(|n| n as u64),
        players_crawled: row.get::<_, Option<i64>>(7)?.map(|n| n as u64),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str, start_player: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, start_player, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, start_player, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64, matches: u64, players: u64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, matches_crawled = ?3, players_crawled = ?4
             WHERE id = ?5",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                matches as i64,
                players as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Documents =====

    fn insert_match(&mut self, run_id: i64, record: &Match) -> StorageResult<()> {
        let document = serde_json::to_string(record)?;
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO matches (match_id, game_id, game_creation, queue_id, platform_id,
                                  game_version, document, discovered_run, inserted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id(),
                record.info.game_id,
                record.info.game_creation,
                record.info.queue_id,
                record.info.platform_id,
                record.info.game_version,
                document,
                run_id,
                now
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO match_participants (match_id, puuid) VALUES (?1, ?2)",
            )?;
            for puuid in record.participant_ids() {
                stmt.execute(params![record.id(), puuid])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn insert_player(&mut self, run_id: i64, profile: &Summoner) -> StorageResult<()> {
        let document = serde_json::to_string(profile)?;
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO players (puuid, summoner_id, name, summoner_level, document,
                                  discovered_run, inserted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                profile.puuid,
                profile.id,
                profile.name,
                profile.summoner_level,
                document,
                run_id,
                now
            ],
        )?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_matches(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM matches")
    }

    fn count_players(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM players")
    }

    fn count_distinct_participants(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(DISTINCT puuid) FROM match_participants")
    }

    fn count_runs(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM runs")
    }
}
