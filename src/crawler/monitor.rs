//! Termination monitor
//!
//! Sleeps on the frontier store's change notifications and cancels the
//! worker pool the first time the quota is met.

use crate::crawler::frontier::FrontierStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Stopping thresholds; the crawl is finished when either one is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub min_matches: usize,
    pub min_players: usize,
}

impl Quota {
    pub fn new(min_matches: usize, min_players: usize) -> Self {
        Self {
            min_matches,
            min_players,
        }
    }

    pub fn is_met(&self, matches: usize, players: usize) -> bool {
        matches >= self.min_matches || players >= self.min_players
    }
}

/// Waits until `quota` is met, then fires `worker_cancel`
///
/// Returns `true` if the quota was met, `false` if the workers were
/// cancelled for another reason first.
pub async fn watch_quota(
    frontier: Arc<FrontierStore>,
    quota: Quota,
    worker_cancel: CancellationToken,
) -> bool {
    let mut changes = frontier.subscribe();

    loop {
        // Mark the current version as seen before reading the counters so a
        // mutation between the check and the wait is never missed
        changes.borrow_and_update();

        let matches = frontier.match_count();
        let players = frontier.player_count();
        if quota.is_met(matches, players) {
            tracing::info!(
                "Quota reached ({} matches, {} players), stopping workers",
                matches,
                players
            );
            worker_cancel.cancel();
            return true;
        }

        tokio::select! {
            _ = worker_cancel.cancelled() => return false,
            changed = changes.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
        }
    }
}
