//! Crawler coordinator - the crawl supervisor
//!
//! This module wires one crawl run together:
//! - Recording the run in storage
//! - Resolving the start player and seeding the frontier with it
//! - Spawning the termination monitor, the dispatcher and the worker pool
//! - Shutting them down in order (workers first, then the dispatcher)
//! - Reporting the final counts

use crate::api::{RiotClient, Routing};
use crate::config::Config;
use crate::crawler::dispatcher::Dispatcher;
use crate::crawler::fetcher::{
    build_http_client, HttpTransport, RequestError, RequestPipeline, RetryPolicy, Transport,
};
use crate::crawler::frontier::FrontierStore;
use crate::crawler::limiter::TokenBucket;
use crate::crawler::monitor::{watch_quota, Quota};
use crate::crawler::worker::{Worker, WorkerContext, WorkerStats};
use crate::storage::{self, open_storage, shared, RunStatus, SharedStorage};
use crate::{CrawlError, Result};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Why a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The match or player quota was met
    QuotaReached,

    /// Every reachable player was crawled before the quota was met
    FrontierExhausted,
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaReached => write!(f, "quota reached"),
            Self::FrontierExhausted => write!(f, "frontier exhausted"),
        }
    }
}

/// Final output of a crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub run_id: i64,

    /// Distinct matches crawled
    pub matches_crawled: usize,

    /// Distinct players seen (crawled or still queued)
    pub players_seen: usize,

    /// Player profiles fetched and stored
    pub players_profiled: u64,

    /// Match records that could not be fetched
    pub match_failures: u64,

    pub elapsed: Duration,
    pub outcome: CrawlOutcome,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: SharedStorage,
    client: Arc<RiotClient>,
    frontier: Arc<FrontierStore>,
    config_hash: String,
}

impl Coordinator {
    /// Creates a coordinator talking to the remote API over HTTP
    ///
    /// The API token is read from the environment variable named in the
    /// configuration; a missing token is logged and requests go out without
    /// one.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, recorded with the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - Failed to open storage or build the HTTP client
    pub fn new(config: Config, config_hash: String) -> Result<Self> {
        let storage = open_storage(Path::new(&config.output.database_path))?;

        let api_key = match std::env::var(&config.api.key_env) {
            Ok(key) => key,
            Err(_) => {
                tracing::warn!(
                    "Environment variable {} is not set, requests carry no API token",
                    config.api.key_env
                );
                String::new()
            }
        };
        let transport = Arc::new(HttpTransport::new(build_http_client(&api_key)?));

        Self::with_parts(config, shared(storage), transport, config_hash)
    }

    /// Creates a coordinator from an already opened storage backend and a
    /// transport
    pub fn with_parts(
        config: Config,
        storage: SharedStorage,
        transport: Arc<dyn Transport>,
        config_hash: String,
    ) -> Result<Self> {
        let routing = Routing::for_platform(&config.crawler.platform)?;
        let limiter = Arc::new(TokenBucket::from_config(&config.rate_limit));
        let policy = RetryPolicy::new(
            config.crawler.max_attempts,
            config.rate_limit.backoff_unit(),
        );
        let pipeline = RequestPipeline::new(transport, limiter, policy);
        let client = RiotClient::new(
            pipeline,
            routing,
            config.api.base_url.as_deref(),
            config.crawler.queue,
            config.crawler.page_size,
        );

        Ok(Self {
            config: Arc::new(config),
            storage,
            client: Arc::new(client),
            frontier: Arc::new(FrontierStore::new()),
            config_hash,
        })
    }

    /// The frontier store of this run
    pub fn frontier(&self) -> Arc<FrontierStore> {
        self.frontier.clone()
    }

    /// Runs the crawl to completion
    ///
    /// Fails only when the run cannot be recorded or the start player
    /// cannot be resolved; every other failure is logged and skipped.
    pub async fn run(self) -> Result<CrawlReport> {
        let started = Instant::now();
        let crawler = &self.config.crawler;
        let start_name = crawler.start_player.clone();

        let run_id = storage::lock(&self.storage).create_run(&self.config_hash, &start_name)?;
        tracing::info!("Starting crawl run {} from {}", run_id, start_name);

        let start = match self.resolve_start_player(&start_name).await {
            Ok(puuid) => puuid,
            Err(e) => {
                tracing::error!("Could not resolve start player {}: {}", start_name, e);
                if let Err(se) = storage::lock(&self.storage).update_run_status(run_id, RunStatus::Failed) {
                    tracing::error!("Failed to mark run {} as failed: {}", run_id, se);
                }
                return Err(CrawlError::StartPlayer {
                    name: start_name,
                    source: e,
                });
            }
        };
        self.frontier.mark_player_seen(&start);
        self.frontier.enqueue(start);

        let quota = Quota::new(crawler.effective_min_matches(), crawler.effective_min_players());
        tracing::info!(
            "Crawling with {} workers until {} matches or {} players",
            crawler.worker_count(),
            quota.min_matches,
            quota.min_players
        );

        let (player_tx, player_rx) = mpsc::channel(crawler.concurrency);
        let (participant_tx, participant_rx) = mpsc::channel(crawler.concurrency);
        let worker_cancel = CancellationToken::new();
        let dispatcher_cancel = CancellationToken::new();

        let monitor = tokio::spawn(watch_quota(self.frontier.clone(), quota, worker_cancel.clone()));

        let dispatcher = Dispatcher::new(
            self.frontier.clone(),
            player_tx,
            participant_rx,
            worker_cancel.clone(),
        );
        let dispatcher = tokio::spawn(dispatcher.run(dispatcher_cancel.clone()));

        let ctx = Arc::new(WorkerContext {
            client: self.client.clone(),
            frontier: self.frontier.clone(),
            storage: self.storage.clone(),
            run_id,
            idle_timeout: crawler.idle_timeout(),
        });
        let player_rx = Arc::new(tokio::sync::Mutex::new(player_rx));
        let workers: Vec<_> = (0..crawler.worker_count())
            .map(|id| {
                let worker = Worker::new(id, ctx.clone());
                tokio::spawn(worker.run(player_rx.clone(), participant_tx.clone(), worker_cancel.clone()))
            })
            .collect();
        drop(participant_tx);

        let mut totals = WorkerStats::default();
        for (id, handle) in workers.into_iter().enumerate() {
            let stats = handle
                .await
                .map_err(|e| CrawlError::TaskFailed(format!("worker {}: {}", id, e)))?;
            tracing::info!(
                worker = id,
                "Worker done: {} players, {} matches, {} failed matches, {} failed histories",
                stats.players_processed,
                stats.matches_fetched,
                stats.match_failures,
                stats.history_failures
            );
            totals.merge(&stats);
        }

        dispatcher_cancel.cancel();
        let dispatch = dispatcher
            .await
            .map_err(|e| CrawlError::TaskFailed(format!("dispatcher: {}", e)))?;
        monitor
            .await
            .map_err(|e| CrawlError::TaskFailed(format!("monitor: {}", e)))?;

        let matches_crawled = self.frontier.match_count();
        let players_seen = self.frontier.player_count();
        let outcome = if quota.is_met(matches_crawled, players_seen) {
            CrawlOutcome::QuotaReached
        } else {
            CrawlOutcome::FrontierExhausted
        };
        tracing::debug!("Dispatcher summary: {:?}", dispatch);

        if let Err(e) = storage::lock(&self.storage).complete_run(
            run_id,
            matches_crawled as u64,
            players_seen as u64,
        ) {
            tracing::error!("Failed to mark run {} as completed: {}", run_id, e);
        }

        let elapsed = started.elapsed();
        tracing::info!(
            "Crawl completed ({}): {} matches, {} players in {:?}",
            outcome,
            matches_crawled,
            players_seen,
            elapsed
        );

        Ok(CrawlReport {
            run_id,
            matches_crawled,
            players_seen,
            players_profiled: totals.players_profiled,
            match_failures: totals.match_failures,
            elapsed,
            outcome,
        })
    }

    async fn resolve_start_player(&self, name: &str) -> std::result::Result<String, RequestError> {
        let profile = self.client.player_by_name(name).await?;
        if profile.puuid.is_empty() {
            return Err(RequestError::Decode {
                url: name.to_string(),
                message: "summoner without a PUUID".to_string(),
            });
        }
        tracing::info!("Start player {} resolved to {}", name, profile.puuid);
        Ok(profile.puuid)
    }
}

/// Runs a complete crawl with storage and HTTP transport taken from the
/// configuration
///
/// # Example
///
/// ```no_run
/// use league_crawler::config::load_config_with_hash;
/// use league_crawler::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let report = run_crawl(config, hash).await?;
/// println!("{} matches", report.matches_crawled);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, config_hash: String) -> Result<CrawlReport> {
    Coordinator::new(config, config_hash)?.run().await
}
