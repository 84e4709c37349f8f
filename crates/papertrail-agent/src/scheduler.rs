//! Cooperative main loop.
//!
//! Each iteration runs a fetch cycle when one is due, then gives the request
//! server one short chance to answer a client, then sleeps. Everything runs
//! on the caller's task; a fetch cycle blocks request serving until it ends.

use std::time::Duration;

use papertrail_db::{MergeOutcome, PaperStore};
use papertrail_ingestion::{EntryParser, FeedSource, FetchCycle};
use papertrail_llm::Summarizer;
use papertrail_web::{PollOutcome, RequestServer};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_secs(3600);
pub const DEFAULT_LOOP_SLEEP: Duration = Duration::from_millis(50);

/// What one fetch-and-merge step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub new_papers: usize,
    pub keywords_failed: usize,
    /// `None` when persisting the batch failed; the store is then unchanged.
    pub merge: Option<MergeOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Set when a fetch cycle ran during this tick.
    pub fetch: Option<FetchSummary>,
    /// `None` when accepting a connection failed.
    pub poll: Option<PollOutcome>,
}

pub struct Scheduler<F, P, S> {
    cycle: FetchCycle<F, P, S>,
    store: PaperStore,
    server: RequestServer,
    fetch_interval: Duration,
    loop_sleep: Duration,
    last_fetch: Option<Instant>,
}

impl<F, P, S> Scheduler<F, P, S>
where
    F: FeedSource,
    P: EntryParser,
    S: Summarizer,
{
    pub fn new(cycle: FetchCycle<F, P, S>, store: PaperStore, server: RequestServer) -> Self {
        Self {
            cycle,
            store,
            server,
            fetch_interval: DEFAULT_FETCH_INTERVAL,
            loop_sleep: DEFAULT_LOOP_SLEEP,
            last_fetch: None,
        }
    }

    pub fn with_fetch_interval(mut self, interval: Duration) -> Self {
        self.fetch_interval = interval;
        self
    }

    pub fn with_loop_sleep(mut self, sleep: Duration) -> Self {
        self.loop_sleep = sleep;
        self
    }

    pub fn store(&self) -> &PaperStore {
        &self.store
    }

    pub fn server(&self) -> &RequestServer {
        &self.server
    }

    /// Loop until Ctrl+C. The interrupt is only observed between iterations,
    /// so a running fetch cycle always completes.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(
            addr = %self.server().local_addr()?,
            stored = self.store().len(),
            keywords = ?self.cycle.keywords(),
            interval_secs = self.fetch_interval.as_secs(),
            "Papertrail ready. Press Ctrl+C to stop."
        );

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            let report = self.tick().await;
            if let Some(fetch) = report.fetch {
                debug!(
                    new_papers = fetch.new_papers,
                    keywords_failed = fetch.keywords_failed,
                    persisted = fetch.merge.is_some_and(|m| m.persisted),
                    "Next check in {}s",
                    self.fetch_interval.as_secs()
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(self.loop_sleep) => {}
                res = &mut shutdown => {
                    res?;
                    info!("Program stopped by user");
                    return Ok(());
                }
            }
        }
    }

    /// One loop iteration without the trailing sleep.
    pub async fn tick(&mut self) -> TickReport {
        let fetch = if self.fetch_due() {
            Some(self.fetch_and_merge().await)
        } else {
            None
        };

        let poll = match self.server.poll_once(self.store.snapshot()).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "Error accepting connection");
                None
            }
        };

        TickReport { fetch, poll }
    }

    fn fetch_due(&self) -> bool {
        self.last_fetch
            .map_or(true, |started| started.elapsed() >= self.fetch_interval)
    }

    async fn fetch_and_merge(&mut self) -> FetchSummary {
        let started = Instant::now();
        info!("Checking for new papers...");

        let report = self.cycle.run(&self.store).await;
        let new_papers = report.papers.len();
        let keywords_failed = report.keywords_failed.len();

        let merge = if report.papers.is_empty() {
            info!("No new papers found");
            Some(MergeOutcome::default())
        } else {
            info!(new_papers, "Found new papers");
            match self.store.merge(report.papers) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!(error = %e, path = %self.store.path().display(), "Error saving papers");
                    None
                }
            }
        };

        self.last_fetch = Some(started);
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, stored = self.store.len(), "Fetch step finished");

        FetchSummary { new_papers, keywords_failed, merge }
    }
}
