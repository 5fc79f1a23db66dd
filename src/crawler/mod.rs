//! Crawler module: the concurrent breadth-first crawl
//!
//! This module contains the core crawling logic, including:
//! - The frontier queue and its deduplication sets
//! - Rate-limited, retrying request issuing
//! - The worker pool, the dispatcher and the termination monitor
//! - Overall crawl coordination

mod coordinator;
mod dispatcher;
mod fetcher;
mod frontier;
mod limiter;
mod monitor;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{run_crawl, Coordinator, CrawlOutcome, CrawlReport};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use fetcher::{
    build_http_client, HttpTransport, RawResponse, RequestError, RequestPipeline, RetryPolicy,
    RetryReason, Transport,
};
pub use frontier::{FrontierStore, QueueEmpty};
pub use limiter::TokenBucket;
pub use monitor::{watch_quota, Quota};
pub use worker::{PlayerReceiver, Worker, WorkerContext, WorkerStats};

use crate::config::Config;
use crate::Result;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the storage layer and record a new run
/// 2. Build the HTTP client and the shared rate limiter
/// 3. Resolve the start player and seed the frontier
/// 4. Crawl until the quota is met or the frontier runs dry
/// 5. Record the final counts
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed
/// * `Err(CrawlError)` - Crawl could not start
pub async fn crawl(config: Config, config_hash: String) -> Result<CrawlReport> {
    run_crawl(config, config_hash).await
}
