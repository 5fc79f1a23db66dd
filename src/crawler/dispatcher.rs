//! Dispatcher
//!
//! The single writer of the frontier queue. It folds every participants
//! batch the workers send back into the seen-players set and the frontier,
//! then tops the player channel back up from the front of the frontier.
//!
//! It also notices when the reachable part of the graph has been crawled:
//! no player handed out is still being worked on and the frontier is empty,
//! so no further batch can ever arrive. In that case it fires the worker
//! cancellation token itself.

use crate::api::PlayerId;
use crate::crawler::frontier::{FrontierStore, QueueEmpty};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// What the dispatcher did over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Participants batches received from workers
    pub batches: u64,

    /// Players newly seen and queued
    pub players_enqueued: u64,

    /// Players handed to the worker pool
    pub players_dispatched: u64,

    /// Empty ids found in batches and dropped
    pub dropped_ids: u64,

    /// Whether the dispatcher stopped the workers because nothing was left
    pub frontier_exhausted: bool,
}

pub struct Dispatcher {
    frontier: Arc<FrontierStore>,
    players: mpsc::Sender<PlayerId>,
    participants: mpsc::Receiver<Vec<PlayerId>>,
    worker_cancel: CancellationToken,

    /// Players sent to the pool whose batch has not come back yet
    in_flight: usize,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(
        frontier: Arc<FrontierStore>,
        players: mpsc::Sender<PlayerId>,
        participants: mpsc::Receiver<Vec<PlayerId>>,
        worker_cancel: CancellationToken,
    ) -> Self {
        Self {
            frontier,
            players,
            participants,
            worker_cancel,
            in_flight: 0,
            stats: DispatchStats::default(),
        }
    }

    /// Runs until `cancel` fires or every worker has hung up
    ///
    /// Batches still buffered when `cancel` fires are folded into the
    /// frontier before returning, without dispatching anything more.
    pub async fn run(mut self, cancel: CancellationToken) -> DispatchStats {
        tracing::debug!("Dispatcher started");
        self.refill();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.drain();
                    break;
                }
                batch = self.participants.recv() => match batch {
                    Some(batch) => {
                        self.in_flight = self.in_flight.saturating_sub(1);
                        self.absorb(batch);
                        self.refill();
                    }
                    None => {
                        tracing::debug!("All workers hung up");
                        break;
                    }
                },
            }
        }

        tracing::debug!(
            "Dispatcher stopped: {} batches, {} players queued, {} left in frontier",
            self.stats.batches,
            self.stats.players_enqueued,
            self.frontier.queued()
        );
        self.stats
    }

    /// Marks every unseen participant seen and queues it
    fn absorb(&mut self, batch: Vec<PlayerId>) {
        self.stats.batches += 1;

        for puuid in batch {
            if puuid.is_empty() {
                self.stats.dropped_ids += 1;
                tracing::warn!("Dropping empty participant id");
                continue;
            }
            if self.frontier.mark_player_seen(&puuid) {
                self.frontier.enqueue(puuid);
                self.stats.players_enqueued += 1;
            }
        }
    }

    /// Moves players from the frontier into the free slots of the player channel
    fn refill(&mut self) {
        if self.worker_cancel.is_cancelled() {
            return;
        }

        for _ in 0..self.players.capacity() {
            if self.worker_cancel.is_cancelled() {
                return;
            }
            let puuid = match self.frontier.dequeue_next() {
                Ok(puuid) => puuid,
                Err(QueueEmpty) => break,
            };

            // Only this task sends, so the free slots counted above stay free
            match self.players.try_send(puuid) {
                Ok(()) => {
                    self.in_flight += 1;
                    self.stats.players_dispatched += 1;
                }
                Err(TrySendError::Full(puuid)) | Err(TrySendError::Closed(puuid)) => {
                    tracing::warn!("Player channel unavailable, dropping {}", puuid);
                    break;
                }
            }
        }

        if self.in_flight == 0 && self.frontier.is_queue_empty() {
            tracing::info!(
                "Frontier exhausted after {} players, stopping workers",
                self.frontier.player_count()
            );
            self.stats.frontier_exhausted = true;
            self.worker_cancel.cancel();
        }
    }

    fn drain(&mut self) {
        while let Ok(batch) = self.participants.try_recv() {
            self.absorb(batch);
        }
    }
}
