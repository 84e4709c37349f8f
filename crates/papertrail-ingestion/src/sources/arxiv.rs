//! arXiv export API client.
//!
//! Endpoint used:
//!   query: http://export.arxiv.org/api/query
//!
//! Results are requested newest first, capped per keyword so that one
//! polling cycle over all keywords stays near the store capacity.

use std::time::Duration;

use async_trait::async_trait;
use papertrail_common::{PapertrailError, Result};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::FeedSource;

pub const ARXIV_QUERY_URL: &str = "http://export.arxiv.org/api/query";

/// Per-keyword result cap: `max_papers / keyword_count`, never below 1.
pub fn per_keyword_cap(max_papers: usize, keyword_count: usize) -> usize {
    (max_papers / keyword_count.max(1)).max(1)
}

pub struct ArxivClient {
    client: Client,
    base_url: Url,
    max_results: usize,
}

impl ArxivClient {
    pub fn new(base_url: &str, max_results: usize, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PapertrailError::Config(format!("invalid feed URL '{base_url}': {e}")))?;
        // No idle pooling: the connection is closed once each response is read.
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self { client, base_url, max_results })
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Query URL for one keyword.
    pub fn query_url(&self, keyword: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("search_query", &format!("all:{}", keyword.trim()))
            .append_pair("start", "0")
            .append_pair("max_results", &self.max_results.to_string())
            .append_pair("sortBy", "submittedDate")
            .append_pair("sortOrder", "descending");
        url
    }
}

#[async_trait]
impl FeedSource for ArxivClient {
    #[instrument(skip(self))]
    async fn fetch_raw(&self, keyword: &str) -> Result<String> {
        let url = self.query_url(keyword);
        info!(%keyword, max_results = self.max_results, "Fetching papers for keyword");

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.text().await?;

        if status != StatusCode::OK {
            warn!(
                %keyword,
                status = status.as_u16(),
                ?headers,
                body = %body,
                "Feed returned a non-200 response"
            );
            return Err(PapertrailError::FeedStatus {
                keyword: keyword.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(%keyword, bytes = body.len(), "Fetch complete");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertrail_test_utils::{serve_once, MockResponse};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_per_keyword_cap() {
        assert_eq!(per_keyword_cap(50, 3), 16);
        assert_eq!(per_keyword_cap(5, 1), 5);
        assert_eq!(per_keyword_cap(2, 5), 1);
        assert_eq!(per_keyword_cap(10, 0), 10);
    }

    #[test]
    fn test_query_url() {
        let c = ArxivClient::new(ARXIV_QUERY_URL, 16, Duration::from_secs(1)).unwrap();
        assert_eq!(c.max_results(), 16);
        assert_eq!(
            c.query_url("reinforcement learning").as_str(),
            "http://export.arxiv.org/api/query?search_query=all%3Areinforcement+learning\
             &start=0&max_results=16&sortBy=submittedDate&sortOrder=descending"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = ArxivClient::new("not a url", 1, Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, PapertrailError::Config(_)));
    }

    #[tokio::test]
    async fn test_fetch_raw_returns_body() {
        let feed = "<feed><entry><id>x</id></entry></feed>";
        let server = serve_once(MockResponse::ok("application/atom+xml", feed)).await;

        let c = ArxivClient::new(&format!("{}/api/query", server.base_url), 3, Duration::from_secs(5)).unwrap();
        let body = c.fetch_raw("robotics").await.unwrap();
        assert_eq!(body, feed);

        let raw = server.request().await;
        assert!(raw.starts_with(
            "GET /api/query?search_query=all%3Arobotics&start=0&max_results=3&sortBy=submittedDate&sortOrder=descending "
        ));
    }

    #[tokio::test]
    async fn test_fetch_raw_non_200_is_error() {
        let server = serve_once(MockResponse::status(503, "Service Unavailable")).await;

        let c = ArxivClient::new(&server.base_url, 3, Duration::from_secs(5)).unwrap();
        match c.fetch_raw("robotics").await {
            Err(PapertrailError::FeedStatus { keyword, status }) => {
                assert_eq!(keyword, "robotics");
                assert_eq!(status, 503);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_raw_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let c = ArxivClient::new(&format!("http://{addr}/api/query"), 3, Duration::from_secs(2)).unwrap();
        assert!(matches!(c.fetch_raw("robotics").await, Err(PapertrailError::Http(_))));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_arxiv_live_query() {
        let c = ArxivClient::new(ARXIV_QUERY_URL, 2, Duration::from_secs(30)).unwrap();
        let body = c.fetch_raw("robotics").await.expect("arXiv query failed");
        assert!(body.contains("<entry>"));
    }
}
