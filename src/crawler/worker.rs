//! Worker pool
//!
//! Each worker takes one player at a time from the shared player channel,
//! walks that player's whole match history, persists every match nobody has
//! crawled yet, and reports the participants it met back to the dispatcher.
//! A worker only stops when the worker cancellation token fires (or the
//! player channel closes); running out of work just means waiting.

use crate::api::{PlayerId, RiotClient};
use crate::crawler::frontier::FrontierStore;
use crate::storage::{self, SharedStorage, Storage, StorageResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Receiving end of the player channel, shared by every worker
pub type PlayerReceiver = Arc<Mutex<mpsc::Receiver<PlayerId>>>;

/// Everything a worker needs, shared by the whole pool
pub struct WorkerContext {
    pub client: Arc<RiotClient>,
    pub frontier: Arc<FrontierStore>,
    pub storage: SharedStorage,
    pub run_id: i64,

    /// How long to wait for a player before logging that the worker is idle
    pub idle_timeout: Duration,
}

/// Per-worker counters, returned when the worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Players taken from the channel
    pub players_processed: u64,

    /// Player profiles fetched and handed to storage
    pub players_profiled: u64,

    /// Matches fetched and handed to storage
    pub matches_fetched: u64,

    /// Match records that could not be fetched
    pub match_failures: u64,

    /// Match histories that ended on a failed page
    pub history_failures: u64,
}

impl WorkerStats {
    /// Adds another worker's counters to these
    pub fn merge(&mut self, other: &WorkerStats) {
        self.players_processed += other.players_processed;
        self.players_profiled += other.players_profiled;
        self.matches_fetched += other.matches_fetched;
        self.match_failures += other.match_failures;
        self.history_failures += other.history_failures;
    }
}

enum Next {
    Player(PlayerId),
    Idle,
    Closed,
}

/// One member of the pool
pub struct Worker {
    id: usize,
    ctx: Arc<WorkerContext>,
    stats: WorkerStats,
}

impl Worker {
    pub fn new(id: usize, ctx: Arc<WorkerContext>) -> Self {
        Self {
            id,
            ctx,
            stats: WorkerStats::default(),
        }
    }

    /// Runs until `cancel` fires or the player channel closes
    ///
    /// Every player taken from `players` produces exactly one batch on
    /// `participants` (possibly empty), unless cancellation is observed
    /// while that player's matches are being walked.
    pub async fn run(
        mut self,
        players: PlayerReceiver,
        participants: mpsc::Sender<Vec<PlayerId>>,
        cancel: CancellationToken,
    ) -> WorkerStats {
        tracing::debug!(worker = self.id, "Worker started");

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = self.next_player(&players) => next,
            };

            match next {
                Next::Player(puuid) => {
                    self.stats.players_processed += 1;
                    self.crawl_player(puuid, &participants, &cancel).await;
                }
                Next::Idle => {
                    tracing::info!(
                        worker = self.id,
                        "No player received for {:?}, still waiting",
                        self.ctx.idle_timeout
                    );
                }
                Next::Closed => {
                    tracing::debug!(worker = self.id, "Player channel closed");
                    break;
                }
            }
        }

        tracing::debug!(worker = self.id, "Worker stopped");
        self.stats
    }

    async fn next_player(&self, players: &PlayerReceiver) -> Next {
        let recv = async { players.lock().await.recv().await };
        match tokio::time::timeout(self.ctx.idle_timeout, recv).await {
            Ok(Some(puuid)) => Next::Player(puuid),
            Ok(None) => Next::Closed,
            Err(_) => Next::Idle,
        }
    }

    async fn crawl_player(
        &mut self,
        puuid: PlayerId,
        participants: &mpsc::Sender<Vec<PlayerId>>,
        cancel: &CancellationToken,
    ) {
        tracing::info!(worker = self.id, "Crawling player {}", puuid);

        let Some(discovered) = self.crawl_matches(&puuid, cancel).await else {
            tracing::debug!(
                worker = self.id,
                "Cancelled while crawling {}, discarding its participants",
                puuid
            );
            return;
        };

        if participants.send(discovered).await.is_err() {
            tracing::debug!(worker = self.id, "Dispatcher gone, participants of {} dropped", puuid);
        }

        self.profile_player(&puuid).await;
    }

    /// Walks a player's match history; `None` if cancelled part way
    async fn crawl_matches(
        &mut self,
        puuid: &str,
        cancel: &CancellationToken,
    ) -> Option<Vec<PlayerId>> {
        let ctx = self.ctx.clone();
        let history = ctx.client.match_history(puuid, cancel).await;
        if history.cancelled {
            return None;
        }
        if let Some(e) = &history.error {
            self.stats.history_failures += 1;
            tracing::warn!(
                worker = self.id,
                "Match history of {} incomplete after {} ids: {}",
                puuid,
                history.ids.len(),
                e
            );
        }
        tracing::debug!(worker = self.id, "{} matches in history of {}", history.ids.len(), puuid);

        let mut discovered = Vec::new();
        for match_id in &history.ids {
            if cancel.is_cancelled() {
                return None;
            }
            if ctx.frontier.has_match(match_id) {
                continue;
            }

            let record = match ctx.client.match_by_id(match_id).await {
                Ok(record) => record,
                Err(e) => {
                    self.stats.match_failures += 1;
                    tracing::error!(worker = self.id, "Skipping match {}: {}", match_id, e);
                    continue;
                }
            };

            // Another worker may have fetched the same match meanwhile
            if !ctx.frontier.mark_match_seen(match_id) {
                continue;
            }
            self.stats.matches_fetched += 1;

            if let Err(e) = self.store(|storage| storage.insert_match(ctx.run_id, &record)) {
                tracing::error!(worker = self.id, "Failed to store match {}: {}", match_id, e);
            }
            discovered.extend(record.participant_ids().iter().cloned());
        }

        Some(discovered)
    }

    async fn profile_player(&mut self, puuid: &str) {
        let ctx = self.ctx.clone();
        match ctx.client.player_by_id(puuid).await {
            Ok(profile) => {
                self.stats.players_profiled += 1;
                if let Err(e) = self.store(|storage| storage.insert_player(ctx.run_id, &profile)) {
                    tracing::error!(worker = self.id, "Failed to store player {}: {}", puuid, e);
                }
            }
            Err(e) => {
                tracing::error!(worker = self.id, "Could not fetch profile of {}: {}", puuid, e);
            }
        }
        ctx.frontier.mark_player_seen(puuid);
    }

    fn store<T>(
        &self,
        op: impl FnOnce(&mut (dyn Storage + Send)) -> StorageResult<T>,
    ) -> StorageResult<T> {
        op(&mut *storage::lock(&self.ctx.storage))
    }
}
