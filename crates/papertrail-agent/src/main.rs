//! Papertrail: arXiv keyword watcher with AI summaries.
//! Entry point for the agent binary.

mod config;
mod scheduler;

use std::path::PathBuf;

use papertrail_db::{ensure_data_dir, PaperStore};
use papertrail_ingestion::sources::arxiv::{per_keyword_cap, ArxivClient};
use papertrail_ingestion::{FetchCycle, MarkerEntryParser};
use papertrail_llm::{GeminiBackend, RemoteSummarizer};
use papertrail_web::RequestServer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, GEMINI_KEY_ENV};
use crate::scheduler::Scheduler;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("papertrail=debug,info")),
        )
        .init();

    info!("Papertrail starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Could not load configuration: {e:#}");
            restart_pause(Config::default().restart_delay()).await;
            std::process::exit(1);
        }
    };
    let restart_delay = config.restart_delay();

    if let Err(e) = run(config).await {
        error!("An error occurred: {e:#}");
        restart_pause(restart_delay).await;
        std::process::exit(1);
    }
}

/// Pause before a fatal exit.
async fn restart_pause(delay: std::time::Duration) {
    warn!(delay_secs = delay.as_secs(), "Exiting after restart delay");
    tokio::time::sleep(delay).await;
}

async fn run(config: Config) -> anyhow::Result<()> {
    let keywords = config.keywords();
    info!(
        keywords = ?keywords,
        max_papers = config.feed.max_papers,
        interval_secs = config.feed.check_interval_secs,
        "Configuration loaded"
    );

    let papers_path = PathBuf::from(&config.storage.papers_path);
    ensure_data_dir(&papers_path)?;
    let store = PaperStore::load(&papers_path, config.feed.max_papers);
    info!(
        capacity = store.max_papers(),
        "Paper store ready: {} papers loaded.",
        store.len()
    );

    let cap = per_keyword_cap(config.feed.max_papers, keywords.len());
    let source = ArxivClient::new(&config.feed.base_url, cap, config.feed_timeout())?;
    info!(per_keyword = source.max_results(), "arXiv client ready");
    let summarizer = build_summarizer(&config)?;
    info!(summaries_enabled = summarizer.is_enabled(), "Summarizer configured");
    let cycle = FetchCycle::new(source, MarkerEntryParser, summarizer, keywords)
        .with_throttle(config.throttle());

    let server = RequestServer::bind(
        &config.server.host,
        config.server.port,
        config.server.fallback_port,
        config.server_timeouts(),
    )
    .await?;

    Scheduler::new(cycle, store, server)
        .with_fetch_interval(config.check_interval())
        .with_loop_sleep(config.loop_sleep())
        .run()
        .await
}

fn build_summarizer(config: &Config) -> anyhow::Result<RemoteSummarizer> {
    let Some(key) = config.llm.api_key() else {
        warn!(
            "Gemini configured but no API key found (set llm.api_key or {GEMINI_KEY_ENV}). \
             Papers will be stored without summaries."
        );
        return Ok(RemoteSummarizer::disabled());
    };

    let backend = GeminiBackend::new(key, &config.llm.model, config.llm_timeout())?
        .with_base_url(&config.llm.base_url);
    info!(model = %config.llm.model, "Gemini summarizer ready");
    Ok(RemoteSummarizer::new(Box::new(backend)))
}
