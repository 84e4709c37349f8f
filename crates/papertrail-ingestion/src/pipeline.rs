//! One polling cycle over all configured keywords.
//!
//! For each keyword, in order:
//!   1. Fetch the raw feed document (failure skips the keyword)
//!   2. Extract candidate entries
//!   3. Drop candidates already stored or already accepted this cycle
//!   4. Replace the abstract with a generated summary
//!   5. Wait the throttle delay after every remote summarization call
//!
//! The cycle never writes to the store; the caller merges `CycleReport::papers`.

use std::collections::HashSet;
use std::time::Duration;

use papertrail_common::Paper;
use papertrail_db::PaperStore;
use papertrail_llm::Summarizer;
use tracing::{debug, info, instrument, warn};

use crate::parser::EntryParser;
use crate::sources::FeedSource;

/// Default pause after each summarization call.
pub const DEFAULT_THROTTLE: Duration = Duration::from_secs(5);

/// Outcome of one cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// New papers in discovery order.
    pub papers: Vec<Paper>,
    /// Keywords whose feed request failed.
    pub keywords_failed: Vec<String>,
    pub candidates_seen: usize,
    pub duplicates_skipped: usize,
}

pub struct FetchCycle<F, P, S> {
    source: F,
    parser: P,
    summarizer: S,
    keywords: Vec<String>,
    throttle: Duration,
}

impl<F, P, S> FetchCycle<F, P, S>
where
    F: FeedSource,
    P: EntryParser,
    S: Summarizer,
{
    pub fn new(source: F, parser: P, summarizer: S, keywords: Vec<String>) -> Self {
        Self {
            source,
            parser,
            summarizer,
            keywords,
            throttle: DEFAULT_THROTTLE,
        }
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Run the cycle to completion. Errors are contained per keyword and
    /// per entry; this never fails.
    #[instrument(skip(self, store), fields(keywords = self.keywords.len()))]
    pub async fn run(&self, store: &PaperStore) -> CycleReport {
        let mut report = CycleReport::default();
        let mut accepted: HashSet<String> = HashSet::new();

        for keyword in &self.keywords {
            let document = match self.source.fetch_raw(keyword).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(%keyword, error = %e, "Error fetching papers for keyword");
                    report.keywords_failed.push(keyword.clone());
                    continue;
                }
            };

            let candidates = self.parser.parse(&document, keyword);
            report.candidates_seen += candidates.len();

            for candidate in candidates {
                if store.contains(&candidate.id) || accepted.contains(&candidate.id) {
                    debug!(id = %candidate.id, "Skipping known paper");
                    report.duplicates_skipped += 1;
                    continue;
                }

                info!(%keyword, title = %candidate.title, "Found new paper");
                let summary = self.summarizer.summarize(&candidate.summary).await;
                if self.summarizer.sends_requests() {
                    tokio::time::sleep(self.throttle).await;
                }

                accepted.insert(candidate.id.clone());
                report.papers.push(Paper::new(candidate, summary, keyword.as_str()));
            }
        }

        info!(
            new_papers = report.papers.len(),
            candidates = report.candidates_seen,
            duplicates = report.duplicates_skipped,
            failed_keywords = report.keywords_failed.len(),
            "Fetch cycle complete"
        );
        report
    }
}
