//! In-process fakes for crawler tests

use crate::api::{Match, RiotClient, Routing, Summoner};
use crate::crawler::fetcher::{RawResponse, RequestError, RequestPipeline, RetryPolicy, Transport};
use crate::crawler::limiter::TokenBucket;
use crate::storage::{RunRecord, RunStatus, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const PAGE_SIZE: u32 = 100;
pub const BASE_URL: &str = "http://riot.test";

/// Transport answering from a table of `path?query` routes; unknown routes
/// are 404s
#[derive(Default)]
pub struct RouteTransport {
    routes: Mutex<HashMap<String, (u16, String)>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl RouteTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, path: &str, status: u16, body: String) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body));
    }

    /// Registers a player resolvable both by name and by PUUID
    pub fn player(&self, name: &str, puuid: &str) {
        let body = json!({
            "id": format!("sid-{}", puuid),
            "accountId": format!("acc-{}", puuid),
            "puuid": puuid,
            "name": name,
            "profileIconId": 7,
            "revisionDate": 1_630_000_000_000i64,
            "summonerLevel": 100
        })
        .to_string();
        self.route(
            &format!("/lol/summoner/v4/summoners/by-name/{}", name),
            200,
            body.clone(),
        );
        self.route(
            &format!("/lol/summoner/v4/summoners/by-puuid/{}", puuid),
            200,
            body,
        );
    }

    /// Registers a one-page match history followed by the empty page
    pub fn history(&self, puuid: &str, match_ids: &[&str]) {
        self.route(
            &history_path(puuid, 0),
            200,
            serde_json::to_string(match_ids).unwrap(),
        );
        self.route(&history_path(puuid, PAGE_SIZE), 200, "[]".to_string());
    }

    pub fn match_record(&self, match_id: &str, participants: &[&str]) {
        self.route(
            &format!("/lol/match/v5/matches/{}", match_id),
            200,
            match_json(match_id, participants),
        );
    }

    /// Number of requests made to exactly `path`
    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Transport for RouteTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, RequestError> {
        let parsed = Url::parse(url).map_err(|e| RequestError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let key = match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        };

        *self.hits.lock().unwrap().entry(key.clone()).or_default() += 1;
        tokio::task::yield_now().await;

        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or((404, "{}".to_string()));
        Ok(RawResponse { status, body })
    }
}

pub fn history_path(puuid: &str, start: u32) -> String {
    format!(
        "/lol/match/v5/matches/by-puuid/{}/ids?queue=420&start={}&count={}",
        puuid, start, PAGE_SIZE
    )
}

pub fn match_json(match_id: &str, participants: &[&str]) -> String {
    let details: Vec<_> = participants
        .iter()
        .enumerate()
        .map(|(i, puuid)| json!({"puuid": puuid, "participantId": i + 1, "goldEarned": 9000}))
        .collect();

    json!({
        "metadata": {"dataVersion": "2", "matchId": match_id, "participants": participants},
        "info": {
            "gameCreation": 1_630_000_000_000i64,
            "gameDuration": 1800,
            "gameId": 1,
            "gameMode": "CLASSIC",
            "gameVersion": "11.17",
            "platformId": "EUW1",
            "queueId": 420,
            "participants": details
        }
    })
    .to_string()
}

/// Client over `transport` with a limiter too generous to matter
pub fn test_client(transport: Arc<dyn Transport>) -> Arc<RiotClient> {
    let limiter = Arc::new(TokenBucket::new(Duration::from_nanos(1), 1000));
    let pipeline = RequestPipeline::new(
        transport,
        limiter,
        RetryPolicy::new(2, Duration::from_millis(1)),
    );
    let routing = Routing::for_platform("EUW").unwrap();
    Arc::new(RiotClient::new(
        pipeline,
        routing,
        Some(BASE_URL),
        420,
        PAGE_SIZE,
    ))
}

/// What a [`RecordingStorage`] was handed
#[derive(Debug, Default)]
pub struct Recorded {
    pub runs: Vec<RunRecord>,
    pub matches: Vec<String>,
    pub players: Vec<String>,
}

/// Storage that only remembers the ids it was asked to insert, every call
/// included (duplicates are recorded too)
#[derive(Clone, Default)]
pub struct RecordingStorage {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingStorage {
    pub fn matches(&self) -> Vec<String> {
        let mut ids = self.inner.lock().unwrap().matches.clone();
        ids.sort();
        ids
    }

    pub fn players(&self) -> Vec<String> {
        let mut ids = self.inner.lock().unwrap().players.clone();
        ids.sort();
        ids
    }

    pub fn run(&self, run_id: i64) -> RunRecord {
        self.get_run(run_id).unwrap()
    }
}

impl Storage for RecordingStorage {
    fn create_run(&mut self, config_hash: &str, start_player: &str) -> StorageResult<i64> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.runs.len() as i64 + 1;
        inner.runs.push(RunRecord {
            id,
            started_at: "now".to_string(),
            finished_at: None,
            config_hash: config_hash.to_string(),
            start_player: start_player.to_string(),
            status: RunStatus::Running,
            matches_crawled: None,
            players_crawled: None,
        });
        Ok(id)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.inner
            .lock()
            .unwrap()
            .runs
            .iter()
            .find(|run| run.id == run_id)
            .cloned()
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        Ok(self.inner.lock().unwrap().runs.last().cloned())
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or(StorageError::RunNotFound(run_id))?;
        run.status = status;
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64, matches: u64, players: u64) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or(StorageError::RunNotFound(run_id))?;
        run.status = RunStatus::Completed;
        run.finished_at = Some("later".to_string());
        run.matches_crawled = Some(matches);
        run.players_crawled = Some(players);
        Ok(())
    }

    fn insert_match(&mut self, _run_id: i64, record: &Match) -> StorageResult<()> {
        self.inner
            .lock()
            .unwrap()
            .matches
            .push(record.id().to_string());
        Ok(())
    }

    fn insert_player(&mut self, _run_id: i64, profile: &Summoner) -> StorageResult<()> {
        self.inner
            .lock()
            .unwrap()
            .players
            .push(profile.puuid.clone());
        Ok(())
    }

    fn count_matches(&self) -> StorageResult<u64> {
        Ok(self.inner.lock().unwrap().matches.len() as u64)
    }

    fn count_players(&self) -> StorageResult<u64> {
        Ok(self.inner.lock().unwrap().players.len() as u64)
    }

    fn count_distinct_participants(&self) -> StorageResult<u64> {
        Ok(0)
    }

    fn count_runs(&self) -> StorageResult<u64> {
        Ok(self.inner.lock().unwrap().runs.len() as u64)
    }
}
