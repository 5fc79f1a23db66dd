//! Frontier store: the crawl queue and its deduplication sets
//!
//! This module holds:
//! - The FIFO queue of players waiting to be crawled
//! - The append-only set of matches already crawled
//! - The append-only set of players already seen
//!
//! Every operation is atomic on its own; nothing here is atomic across
//! calls. Only the dispatcher enqueues players, which is what keeps an id
//! from entering the queue twice.

use crate::api::{MatchId, PlayerId};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;

/// Returned by [`FrontierStore::dequeue_next`] when nothing is queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No player queued for crawling")]
pub struct QueueEmpty;

/// Concurrency-safe frontier queue plus seen-matches and seen-players sets
///
/// The cardinality of each set is the authoritative counter for matches
/// crawled and players known. Every mutation that grows a set bumps a
/// version number that [`FrontierStore::subscribe`] watchers are woken by.
#[derive(Debug)]
pub struct FrontierStore {
    queue: Mutex<VecDeque<PlayerId>>,
    matches: Mutex<HashSet<MatchId>>,
    players: Mutex<HashSet<PlayerId>>,
    changes: watch::Sender<u64>,
}

impl Default for FrontierStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontierStore {
    /// Creates an empty store
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            queue: Mutex::new(VecDeque::new()),
            matches: Mutex::new(HashSet::new()),
            players: Mutex::new(HashSet::new()),
            changes,
        }
    }

    /// Appends a player to the back of the queue
    ///
    /// No deduplication happens here; callers check [`Self::has_player`]
    /// (or the return of [`Self::mark_player_seen`]) first.
    pub fn enqueue(&self, player: PlayerId) {
        lock(&self.queue).push_back(player);
    }

    /// Removes and returns the player at the front of the queue
    pub fn dequeue_next(&self) -> Result<PlayerId, QueueEmpty> {
        lock(&self.queue).pop_front().ok_or(QueueEmpty)
    }

    /// Number of queued players
    pub fn queued(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn is_queue_empty(&self) -> bool {
        lock(&self.queue).is_empty()
    }

    /// Marks a match as crawled; returns `true` if it was not seen before
    pub fn mark_match_seen(&self, match_id: &str) -> bool {
        let inserted = lock(&self.matches).insert(match_id.to_string());
        if inserted {
            self.notify();
        }
        inserted
    }

    /// Marks a player as seen; returns `true` if it was not seen before
    pub fn mark_player_seen(&self, player: &str) -> bool {
        let inserted = lock(&self.players).insert(player.to_string());
        if inserted {
            self.notify();
        }
        inserted
    }

    pub fn has_match(&self, match_id: &str) -> bool {
        lock(&self.matches).contains(match_id)
    }

    pub fn has_player(&self, player: &str) -> bool {
        lock(&self.players).contains(player)
    }

    /// Number of distinct matches crawled
    pub fn match_count(&self) -> usize {
        lock(&self.matches).len()
    }

    /// Number of distinct players seen
    pub fn player_count(&self) -> usize {
        lock(&self.players).len()
    }

    /// Receiver woken whenever either seen set grows
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Sorted copy of the seen-match ids
    #[cfg(test)]
    pub fn match_ids(&self) -> Vec<MatchId> {
        let mut ids: Vec<_> = lock(&self.matches).iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Sorted copy of the seen-player ids
    #[cfg(test)]
    pub fn player_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<_> = lock(&self.players).iter().cloned().collect();
        ids.sort();
        ids
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }
}

/// Locks a collection; a panicked holder leaves the data valid, so poisoning
/// is ignored
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
