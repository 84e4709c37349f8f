//! Paper feed clients.

pub mod arxiv;

use async_trait::async_trait;
use papertrail_common::Result;

/// Common interface for paper feeds.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the raw feed document for one keyword query.
    ///
    /// One request, no retry. Any failure is returned for this keyword only.
    async fn fetch_raw(&self, keyword: &str) -> Result<String>;
}
