//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the remote API and run the
//! full crawl cycle end-to-end against a SQLite database on disk.

use league_crawler::config::{ApiConfig, Config, CrawlerConfig, OutputConfig, RateLimitConfig};
use league_crawler::crawler::{Coordinator, CrawlOutcome, RequestError};
use league_crawler::storage::{RunStatus, SqliteStorage, Storage};
use league_crawler::CrawlError;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, db_path: &str, key_env: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            start_player: "zero".to_string(),
            platform: "EUW".to_string(),
            concurrency: 2,
            min_matches: 1000,
            min_players: 1000,
            max_attempts: 3,
            idle_timeout_secs: 60,
            queue: 420,
            page_size: 100,
        },
        rate_limit: RateLimitConfig {
            requests: 100_000,
            per_seconds: 1,
            burst: 100,
            backoff_unit_ms: 1, // Very short for testing
        },
        api: ApiConfig {
            key_env: key_env.to_string(),
            base_url: Some(base_url.to_string()),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
    }
}

fn temp_db() -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("crawl.db").to_string_lossy().to_string();
    (dir, db_path)
}

fn summoner(name: &str, puuid: &str) -> serde_json::Value {
    json!({
        "id": format!("sid-{}", puuid),
        "accountId": format!("acc-{}", puuid),
        "puuid": puuid,
        "name": name,
        "profileIconId": 4568,
        "revisionDate": 1_630_000_000_000i64,
        "summonerLevel": 312
    })
}

fn match_record(match_id: &str, participants: &[&str]) -> serde_json::Value {
    let details: Vec<_> = participants
        .iter()
        .map(|puuid| json!({"puuid": puuid, "championName": "Ahri", "kills": 3, "totalDamageDealt": 120000}))
        .collect();

    json!({
        "metadata": {"dataVersion": "2", "matchId": match_id, "participants": participants},
        "info": {
            "gameCreation": 1_630_000_000_000i64,
            "gameDuration": 1800,
            "gameId": 5_413_144_108i64,
            "gameMode": "CLASSIC",
            "gameVersion": "11.17.394.4489",
            "mapId": 11,
            "platformId": "EUW1",
            "queueId": 420,
            "participants": details,
            "teams": [{"teamId": 100, "win": true, "bans": [], "objectives": {"baron": {"first": true, "kills": 1}}}]
        }
    })
}

async fn mount_player(server: &MockServer, name: &str, puuid: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/lol/summoner/v4/summoners/by-name/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(summoner(name, puuid)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/lol/summoner/v4/summoners/by-puuid/{}", puuid)))
        .respond_with(ResponseTemplate::new(200).set_body_json(summoner(name, puuid)))
        .mount(server)
        .await;
}

async fn mount_history_page(server: &MockServer, puuid: &str, start: u32, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/lol/match/v5/matches/by-puuid/{}/ids", puuid)))
        .and(query_param("queue", "420"))
        .and(query_param("start", start.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(ids)))
        .mount(server)
        .await;
}

async fn mount_match(server: &MockServer, match_id: &str, participants: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/lol/match/v5/matches/{}", match_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(match_record(match_id, participants)))
        .mount(server)
        .await;
}

fn open_db(db_path: &str) -> SqliteStorage {
    SqliteStorage::new(Path::new(db_path)).expect("Failed to open DB")
}

#[tokio::test]
async fn test_full_crawl_until_match_quota() {
    let mock_server = MockServer::start().await;
    std::env::set_var("LEAGUE_CRAWLER_TEST_KEY_FULL", "test-key");

    // Every request must carry the API token
    Mock::given(method("GET"))
        .and(path("/lol/summoner/v4/summoners/by-name/zero"))
        .and(header("X-Riot-Token", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(summoner("zero", "P0")))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_player(&mock_server, "zero", "P0").await;
    mount_history_page(&mock_server, "P0", 0, &["M1", "M2"]).await;
    mount_history_page(&mock_server, "P0", 100, &[]).await;
    mount_match(&mock_server, "M1", &["P0", "P1"]).await;
    mount_match(&mock_server, "M2", &["P0", "P2"]).await;

    let (_dir, db_path) = temp_db();
    let mut config = create_test_config(&mock_server.uri(), &db_path, "LEAGUE_CRAWLER_TEST_KEY_FULL");
    config.crawler.min_matches = 2;

    let coordinator =
        Coordinator::new(config, "hash".to_string()).expect("Failed to create coordinator");
    let frontier = coordinator.frontier();
    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.outcome, CrawlOutcome::QuotaReached);
    assert_eq!(report.matches_crawled, 2);
    for player in ["P0", "P1", "P2"] {
        assert!(frontier.has_player(player), "{} should have been seen", player);
    }

    let storage = open_db(&db_path);
    assert_eq!(storage.match_ids().unwrap(), vec!["M1", "M2"]);
    assert_eq!(storage.count_distinct_participants().unwrap(), 3);

    let stored = storage.get_match_document("M1").unwrap().expect("M1 stored");
    assert_eq!(stored.participant_ids(), ["P0", "P1"]);
    assert_eq!(
        stored.info.participants[0].stats.get("totalDamageDealt"),
        Some(&json!(120000))
    );

    let run = storage.get_latest_run().unwrap().expect("run recorded");
    assert_eq!(run.id, report.run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash");
    assert_eq!(run.matches_crawled, Some(2));
}

#[tokio::test]
async fn test_match_history_is_paginated() {
    let mock_server = MockServer::start().await;
    mount_player(&mock_server, "zero", "P0").await;
    mount_history_page(&mock_server, "P0", 0, &["M1", "M2"]).await;
    mount_history_page(&mock_server, "P0", 2, &["M3"]).await;
    mount_history_page(&mock_server, "P0", 4, &[]).await;
    for id in ["M1", "M2", "M3"] {
        mount_match(&mock_server, id, &["P0"]).await;
    }

    let (_dir, db_path) = temp_db();
    let mut config = create_test_config(&mock_server.uri(), &db_path, "LEAGUE_CRAWLER_UNSET");
    config.crawler.page_size = 2;

    let report = Coordinator::new(config, "hash".to_string())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    // P0 only ever played with P0, so the graph runs dry
    assert_eq!(report.outcome, CrawlOutcome::FrontierExhausted);
    assert_eq!(report.matches_crawled, 3);
    assert_eq!(report.players_profiled, 1);

    let storage = open_db(&db_path);
    assert_eq!(storage.match_ids().unwrap(), vec!["M1", "M2", "M3"]);
    assert_eq!(storage.player_ids().unwrap(), vec!["P0"]);
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lol/summoner/v4/summoners/by-name/zero"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_player(&mock_server, "zero", "P0").await;
    mount_history_page(&mock_server, "P0", 0, &[]).await;

    let (_dir, db_path) = temp_db();
    let config = create_test_config(&mock_server.uri(), &db_path, "LEAGUE_CRAWLER_UNSET");

    let report = Coordinator::new(config, "hash".to_string())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.outcome, CrawlOutcome::FrontierExhausted);
    assert_eq!(report.players_seen, 1);
}

#[tokio::test]
async fn test_forbidden_match_is_skipped_without_retry() {
    let mock_server = MockServer::start().await;
    mount_player(&mock_server, "zero", "P0").await;
    mount_history_page(&mock_server, "P0", 0, &["M1", "M2"]).await;
    mount_history_page(&mock_server, "P0", 100, &[]).await;
    Mock::given(method("GET"))
        .and(path("/lol/match/v5/matches/M1"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_match(&mock_server, "M2", &["P0"]).await;

    let (_dir, db_path) = temp_db();
    let config = create_test_config(&mock_server.uri(), &db_path, "LEAGUE_CRAWLER_UNSET");

    let report = Coordinator::new(config, "hash".to_string())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.match_failures, 1);
    assert_eq!(report.matches_crawled, 1);
    assert_eq!(open_db(&db_path).match_ids().unwrap(), vec!["M2"]);
}

#[tokio::test]
async fn test_unknown_start_player_fails_the_run() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lol/summoner/v4/summoners/by-name/zero"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_dir, db_path) = temp_db();
    let config = create_test_config(&mock_server.uri(), &db_path, "LEAGUE_CRAWLER_UNSET");

    let result = Coordinator::new(config, "hash".to_string())
        .expect("Failed to create coordinator")
        .run()
        .await;

    match result {
        Err(CrawlError::StartPlayer { name, source }) => {
            assert_eq!(name, "zero");
            assert!(matches!(source, RequestError::PermanentClient { status: 404, .. }));
        }
        other => panic!("expected a start player failure, got {:?}", other),
    }

    let storage = open_db(&db_path);
    let run = storage.get_latest_run().unwrap().expect("run recorded");
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(storage.count_matches().unwrap(), 0);
}
