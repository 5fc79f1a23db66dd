//! Remote API client
//!
//! Wraps the four remote operations the crawl consumes. Every call goes
//! through the shared [`RequestPipeline`], so all of them draw from the same
//! rate budget and share the same retry policy.

use crate::api::routing::Routing;
use crate::api::types::{Match, MatchId, Summoner};
use crate::crawler::{RequestError, RequestPipeline};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Client for the summoner-v4 and match-v5 resources
pub struct RiotClient {
    pipeline: RequestPipeline,
    platform_base: String,
    regional_base: String,
    queue: u32,
    page_size: u32,
}

impl RiotClient {
    /// Creates a client for the given routing
    ///
    /// `base_url` replaces both hosts when set (local mocks, proxies).
    pub fn new(
        pipeline: RequestPipeline,
        routing: Routing,
        base_url: Option<&str>,
        queue: u32,
        page_size: u32,
    ) -> Self {
        let (platform_base, regional_base) = match base_url {
            Some(base) => (base.to_string(), base.to_string()),
            None => (routing.platform_host(), routing.regional_host()),
        };

        Self {
            pipeline,
            platform_base,
            regional_base,
            queue,
            page_size,
        }
    }

    /// Resolves a player by summoner name
    pub async fn player_by_name(&self, name: &str) -> Result<Summoner, RequestError> {
        let url = resource_url(
            &self.platform_base,
            &["lol", "summoner", "v4", "summoners", "by-name", name],
            &[],
        )?;
        tracing::debug!("Requesting URL: {}", url);
        self.pipeline.fetch_json(&url).await
    }

    /// Resolves a player by PUUID
    pub async fn player_by_id(&self, puuid: &str) -> Result<Summoner, RequestError> {
        let url = resource_url(
            &self.platform_base,
            &["lol", "summoner", "v4", "summoners", "by-puuid", puuid],
            &[],
        )?;
        tracing::debug!("Requesting URL: {}", url);
        self.pipeline.fetch_json(&url).await
    }

    /// One page of a player's match history
    pub async fn match_ids_page(
        &self,
        puuid: &str,
        start: u32,
        count: u32,
    ) -> Result<Vec<MatchId>, RequestError> {
        let url = resource_url(
            &self.regional_base,
            &["lol", "match", "v5", "matches", "by-puuid", puuid, "ids"],
            &[
                ("queue", self.queue.to_string()),
                ("start", start.to_string()),
                ("count", count.to_string()),
            ],
        )?;
        tracing::debug!("Requesting URL: {}", url);
        self.pipeline.fetch_json(&url).await
    }

    /// A player's complete match history
    ///
    /// Requests successive pages until one comes back empty. A page that
    /// fails ends the history early; the ids gathered so far are returned
    /// together with the error so the caller can decide what to keep.
    /// Once `cancel` fires no further page is requested and a page still in
    /// flight (or backing off) is abandoned.
    pub async fn match_history(&self, puuid: &str, cancel: &CancellationToken) -> MatchHistory {
        let mut history = MatchHistory::default();
        let mut start = 0u32;

        loop {
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    history.cancelled = true;
                    return history;
                }
                page = self.match_ids_page(puuid, start, self.page_size) => page,
            };

            match page {
                Ok(page) if page.is_empty() => return history,
                Ok(page) => {
                    history.ids.extend(page);
                    start += self.page_size;
                }
                Err(e) => {
                    history.error = Some(e);
                    return history;
                }
            }
        }
    }

    /// Full match record
    pub async fn match_by_id(&self, match_id: &str) -> Result<Match, RequestError> {
        let url = resource_url(
            &self.regional_base,
            &["lol", "match", "v5", "matches", match_id],
            &[],
        )?;
        tracing::debug!("Requesting URL: {}", url);
        let record: Match = self.pipeline.fetch_json(&url).await?;

        if record.id().is_empty() {
            return Err(RequestError::Decode {
                url,
                message: "match record without an id".to_string(),
            });
        }
        Ok(record)
    }
}

/// Result of walking a paginated match history
#[derive(Debug, Default)]
pub struct MatchHistory {
    pub ids: Vec<MatchId>,

    /// Set when a page failed before the history was complete
    pub error: Option<RequestError>,

    /// Set when the walk stopped on cancellation
    pub cancelled: bool,
}

/// Joins path segments (percent-encoded) and query pairs onto a base URL
fn resource_url(
    base: &str,
    segments: &[&str],
    query: &[(&str, String)],
) -> Result<String, RequestError> {
    let invalid = |message: String| RequestError::Transport {
        url: base.to_string(),
        message,
    };

    let mut url = Url::parse(base).map_err(|e| invalid(format!("invalid base URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| invalid("base URL cannot carry a path".to_string()))?
        .pop_if_empty()
        .extend(segments);

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::{history_path, test_client, RouteTransport, PAGE_SIZE};
    use std::time::Duration;

    #[tokio::test]
    async fn test_match_history_follows_pages() {
        let transport = RouteTransport::new();
        transport.route(&history_path("P0", 0), 200, r#"["M1","M2"]"#.to_string());
        transport.route(&history_path("P0", PAGE_SIZE), 200, r#"["M3"]"#.to_string());
        transport.route(&history_path("P0", 2 * PAGE_SIZE), 200, "[]".to_string());
        let client = test_client(transport.clone());

        let history = client.match_history("P0", &CancellationToken::new()).await;

        assert_eq!(history.ids, vec!["M1", "M2", "M3"]);
        assert!(history.error.is_none());
        assert!(!history.cancelled);
    }

    #[tokio::test]
    async fn test_match_history_stops_when_cancelled() {
        let transport = RouteTransport::new();
        transport.route(&history_path("P0", 0), 200, r#"["M1"]"#.to_string());
        let client = test_client(transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let history = client.match_history("P0", &cancel).await;

        assert!(history.cancelled);
        assert!(history.ids.is_empty());
        assert_eq!(transport.hits(&history_path("P0", 0)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_match_history_abandons_page_in_backoff() {
        let transport = RouteTransport::new();
        transport.route(&history_path("P0", 0), 200, r#"["M1","M2"]"#.to_string());
        transport.route(&history_path("P0", PAGE_SIZE), 503, String::new());
        let client = test_client(transport.clone());
        let cancel = CancellationToken::new();

        let walk = {
            let client = client.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { client.match_history("P0", &cancel).await })
        };
        while transport.hits(&history_path("P0", PAGE_SIZE)) == 0 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();

        let history = tokio::time::timeout(Duration::from_millis(5), walk)
            .await
            .expect("history walk should stop promptly")
            .unwrap();
        assert!(history.cancelled);
        assert_eq!(history.ids, vec!["M1", "M2"]);
        assert!(history.error.is_none());
        assert_eq!(transport.hits(&history_path("P0", PAGE_SIZE)), 1);
    }

    #[test]
    fn test_resource_url_encodes_segments() {
        let url = resource_url(
            "https://euw1.api.riotgames.com",
            &["lol", "summoner", "v4", "summoners", "by-name", "Hide on bush"],
            &[],
        )
        .unwrap();
        assert_eq!(
            url,
            "https://euw1.api.riotgames.com/lol/summoner/v4/summoners/by-name/Hide%20on%20bush"
        );
    }

    #[test]
    fn test_resource_url_with_query_and_trailing_slash() {
        let url = resource_url(
            "http://127.0.0.1:8080/",
            &["lol", "match", "v5", "matches", "by-puuid", "abc", "ids"],
            &[
                ("queue", "420".to_string()),
                ("start", "100".to_string()),
                ("count", "100".to_string()),
            ],
        )
        .unwrap();
        assert_eq!(
            url,
            "http://127.0.0.1:8080/lol/match/v5/matches/by-puuid/abc/ids?queue=420&start=100&count=100"
        );
    }

    #[test]
    fn test_resource_url_rejects_bad_base() {
        assert!(resource_url("not a url", &["lol"], &[]).is_err());
    }
}
