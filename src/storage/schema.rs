//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the League-Crawler database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    start_player TEXT NOT NULL,
    status TEXT NOT NULL,
    matches_crawled INTEGER,
    players_crawled INTEGER
);

-- One document per crawled match
CREATE TABLE IF NOT EXISTS matches (
    match_id TEXT PRIMARY KEY,
    game_id INTEGER NOT NULL,
    game_creation INTEGER NOT NULL,
    queue_id INTEGER NOT NULL,
    platform_id TEXT NOT NULL,
    game_version TEXT NOT NULL,
    document TEXT NOT NULL,
    discovered_run INTEGER NOT NULL REFERENCES runs(id),
    inserted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_matches_run ON matches(discovered_run);

-- Participant edges, the only part of a match the crawl follows
CREATE TABLE IF NOT EXISTS match_participants (
    match_id TEXT NOT NULL REFERENCES matches(match_id),
    puuid TEXT NOT NULL,
    PRIMARY KEY (match_id, puuid)
);

CREATE INDEX IF NOT EXISTS idx_match_participants_puuid ON match_participants(puuid);

-- One profile per crawled player
CREATE TABLE IF NOT EXISTS players (
    puuid TEXT PRIMARY KEY,
    summoner_id TEXT NOT NULL,
    name TEXT NOT NULL,
    summoner_level INTEGER NOT NULL,
    document TEXT NOT NULL,
    discovered_run INTEGER NOT NULL REFERENCES runs(id),
    inserted_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The SQLite connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
