//! papertrail-common — Shared types and errors used across all papertrail crates.

pub mod error;
pub mod models;

// Re-export commonly used types
pub use error::{PapertrailError, Result};
pub use models::{Candidate, Paper, SUMMARY_UNAVAILABLE};
