//! Feed entry extraction.
//!
//! `MarkerEntryParser` scans the raw Atom document for fixed tag markers
//! instead of parsing XML. Callers only see the `EntryParser` trait, so a
//! structured parser can replace it without touching the pipeline.

use papertrail_common::Candidate;
use thiserror::Error;
use tracing::{debug, warn};

const ENTRY_MARKER: &str = "<entry>";

/// Extracts candidate papers from one raw feed document.
pub trait EntryParser: Send + Sync {
    /// Candidates in document order. Malformed entries are skipped.
    fn parse(&self, document: &str, keyword: &str) -> Vec<Candidate>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("missing {marker} marker")]
    MissingMarker { marker: String },
    #[error("closing marker for <{field}> precedes its opening marker")]
    Misordered { field: &'static str },
    #[error("entry has an empty id")]
    EmptyId,
}

/// Fixed-marker scanner for arXiv Atom responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerEntryParser;

impl EntryParser for MarkerEntryParser {
    fn parse(&self, document: &str, keyword: &str) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        // The first fragment is feed-level metadata, not an entry.
        for (index, fragment) in document.split(ENTRY_MARKER).skip(1).enumerate() {
            match parse_entry(fragment) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => warn!(%keyword, entry = index, error = %e, "Skipping malformed feed entry"),
            }
        }

        debug!(%keyword, entries = candidates.len(), "Parsed feed document");
        candidates
    }
}

fn parse_entry(fragment: &str) -> Result<Candidate, EntryError> {
    let id = extract_field(fragment, "id")?;
    if id.is_empty() {
        return Err(EntryError::EmptyId);
    }

    Ok(Candidate {
        id: id.to_string(),
        title: extract_field(fragment, "title")?.to_string(),
        summary: extract_field(fragment, "summary")?.to_string(),
        published: extract_field(fragment, "published")?.to_string(),
    })
}

/// Trimmed text between `<field>` and the next `</field>`.
fn extract_field<'a>(fragment: &'a str, field: &'static str) -> Result<&'a str, EntryError> {
    let open = format!("<{field}>");
    let close = format!("</{field}>");

    let start = fragment
        .find(&open)
        .map(|i| i + open.len())
        .ok_or(EntryError::MissingMarker { marker: open })?;
    let end = match fragment[start..].find(&close) {
        Some(offset) => start + offset,
        None if fragment[..start].contains(&close) => return Err(EntryError::Misordered { field }),
        None => return Err(EntryError::MissingMarker { marker: close }),
    };

    Ok(fragment[start..end].trim())
}
