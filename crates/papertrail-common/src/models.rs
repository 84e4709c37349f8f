//! Data models shared by the fetch pipeline, the store and the web surface.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Summary stored when the summarizer could not produce one.
pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable";

/// A raw feed entry as extracted by the parser, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    /// The feed's own abstract; replaced by a generated summary downstream.
    pub summary: String,
    pub published: String,
}

/// A deduplicated feed entry with its generated summary, as stored and served.
///
/// Field names are part of the persisted file format and of the `/papers`
/// JSON surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub published: String,
    /// Mirrors `id`; the feed identifier doubles as the abstract page URL.
    pub url: String,
    pub keyword: String,
}

impl Paper {
    pub fn new(candidate: Candidate, summary: impl Into<String>, keyword: impl Into<String>) -> Self {
        Self {
            url: candidate.id.clone(),
            id: candidate.id,
            title: candidate.title,
            summary: summary.into(),
            published: candidate.published,
            keyword: keyword.into(),
        }
    }

    /// The `YYYY-MM-DD` part of `published`.
    ///
    /// Falls back to the first 10 characters when the timestamp is not RFC 3339.
    pub fn display_date(&self) -> String {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.published) {
            return ts.date_naive().format("%Y-%m-%d").to_string();
        }
        if let Ok(date) = NaiveDate::parse_from_str(self.published.get(..10).unwrap_or(""), "%Y-%m-%d") {
            return date.format("%Y-%m-%d").to_string();
        }
        self.published.chars().take(10).collect()
    }
}
