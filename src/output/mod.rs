//! Output module for crawl reports and stored statistics
//!
//! This module handles:
//! - Printing the final report of a crawl run
//! - Summarizing what the database holds across runs

pub mod stats;

pub use stats::{format_duration, load_statistics, print_report, print_statistics, CrawlStatistics};
