use serde::Deserialize;
use std::time::Duration;

/// Default quota of matches when none (or zero) is configured
pub const DEFAULT_MIN_MATCHES: usize = 10_000;

/// Default quota of players when none (or zero) is configured
pub const DEFAULT_MIN_PLAYERS: usize = 10;

/// Upper bound accepted for either quota
pub const MAX_QUOTA: usize = 10_000_000;

/// Main configuration structure for League-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub api: ApiConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Summoner name the crawl starts from
    pub start_player: String,

    /// Platform selector (e.g. "EUW", "NA", "KR")
    pub platform: String,

    /// Degree of concurrency; the pool runs `concurrency - 1` workers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Stop once this many distinct matches were crawled (0 = default)
    #[serde(default)]
    pub min_matches: usize,

    /// Stop once this many distinct players are known (0 = default)
    #[serde(default)]
    pub min_players: usize,

    /// Maximum attempts per outbound request
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds a worker may wait for a player before logging that it is idle
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Match-history queue filter (420 = ranked solo/duo)
    #[serde(default = "default_queue")]
    pub queue: u32,

    /// Number of match ids requested per match-history page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl CrawlerConfig {
    /// Effective match quota, substituting the default for zero
    pub fn effective_min_matches(&self) -> usize {
        if self.min_matches > 0 {
            self.min_matches
        } else {
            DEFAULT_MIN_MATCHES
        }
    }

    /// Effective player quota, substituting the default for zero
    pub fn effective_min_players(&self) -> usize {
        if self.min_players > 0 {
            self.min_players
        } else {
            DEFAULT_MIN_PLAYERS
        }
    }

    /// Number of worker tasks in the pool
    pub fn worker_count(&self) -> usize {
        self.concurrency.saturating_sub(1).max(1)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Shared request budget for every outbound call of a crawl
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RateLimitConfig {
    /// Requests permitted per window
    #[serde(default = "default_requests")]
    pub requests: u32,

    /// Length of the window in seconds
    #[serde(default = "default_per_seconds")]
    pub per_seconds: u64,

    /// Token-bucket capacity (requests that may be sent back to back);
    /// counts against `requests`
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Unit of the linear retry backoff, in milliseconds
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
}

impl RateLimitConfig {
    /// Time between two refilled tokens
    ///
    /// A full burst plus the tokens refilled during one window never exceed
    /// `requests`, so the burst is taken out of the refill rate. Rounded up
    /// to the next nanosecond.
    pub fn interval(&self) -> Duration {
        let refills = u128::from(self.requests.saturating_sub(self.burst.max(1)) + 1);
        let window = Duration::from_secs(self.per_seconds).as_nanos();
        let nanos = window.div_ceil(refills);
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: default_requests(),
            per_seconds: default_per_seconds(),
            burst: default_burst(),
            backoff_unit_ms: default_backoff_unit_ms(),
        }
    }
}

/// Remote API access configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiConfig {
    /// Environment variable that holds the API token
    #[serde(default = "default_key_env")]
    pub key_env: String,

    /// Overrides both the platform and the regional host (testing, proxies)
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key_env: default_key_env(),
            base_url: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_concurrency() -> usize {
    6
}

fn default_max_attempts() -> u32 {
    10
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_queue() -> u32 {
    420
}

fn default_page_size() -> u32 {
    100
}

// 15,000 requests every 10 minutes
fn default_requests() -> u32 {
    15_000
}

fn default_per_seconds() -> u64 {
    600
}

fn default_burst() -> u32 {
    1
}

fn default_backoff_unit_ms() -> u64 {
    1_000
}

fn default_key_env() -> String {
    "DEV_KEY".to_string()
}
