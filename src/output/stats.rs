//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::crawler::CrawlReport;
use crate::storage::{RunRecord, Storage, StorageResult};
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Number of crawl runs recorded
    pub runs: u64,

    /// Number of stored matches
    pub matches: u64,

    /// Number of stored player profiles
    pub players: u64,

    /// Distinct players appearing in stored matches
    pub distinct_participants: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<CrawlStatistics> {
    Ok(CrawlStatistics {
        runs: storage.count_runs()?,
        matches: storage.count_matches()?,
        players: storage.count_players()?,
        distinct_participants: storage.count_distinct_participants()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Runs: {}", stats.runs);
    println!("  Matches stored: {}", stats.matches);
    println!("  Player profiles stored: {}", stats.players);
    println!("  Distinct participants: {}", stats.distinct_participants);
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  Id: {}", run.id);
            println!("  Start player: {}", run.start_player);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let (Some(matches), Some(players)) = (run.matches_crawled, run.players_crawled) {
                println!("  Crawled: {} matches, {} players", matches, players);
            }
        }
        None => println!("No crawl runs recorded yet"),
    }

    // Share of participants whose own profile was crawled
    if stats.distinct_participants > 0 {
        let coverage = (stats.players as f64 / stats.distinct_participants as f64) * 100.0;
        println!(
            "\nProfile coverage: {:.1}% ({} / {} participants)",
            coverage, stats.players, stats.distinct_participants
        );
    }
}

/// Prints the final report of a crawl run
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Complete ===\n");
    println!("  Run: {}", report.run_id);
    println!("  Outcome: {}", report.outcome);
    println!("  Matches crawled: {}", report.matches_crawled);
    println!("  Players seen: {}", report.players_seen);
    println!("  Players profiled: {}", report.players_profiled);
    if report.match_failures > 0 {
        println!("  Matches skipped after errors: {}", report.match_failures);
    }
    println!("  Elapsed: {}", format_duration(report.elapsed));
}

/// Formats a duration as `1h 02m 03s`, `2m 03s` or `3.4s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
