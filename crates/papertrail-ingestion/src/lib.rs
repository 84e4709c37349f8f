//! papertrail-ingestion — Feed polling pipeline.
//! - Feed retrieval (arXiv Atom API, one query per keyword)
//! - Marker-based entry extraction
//! - Dedup against the store, summarization, throttling

pub mod parser;
pub mod pipeline;
pub mod sources;

pub use parser::{EntryParser, MarkerEntryParser};
pub use pipeline::{CycleReport, FetchCycle};
pub use sources::FeedSource;
