//! Boundary to the remote game API
//!
//! Routing values, the wire records and the client used by the crawl
//! workers. The shape of these resources is an external contract.

mod client;
mod routing;
pub mod types;

pub use client::{MatchHistory, RiotClient};
pub use routing::Routing;
pub use types::{Match, MatchId, PlayerId, Summoner};
