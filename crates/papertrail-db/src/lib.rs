//! papertrail-db — Persistent paper store.
//!
//! The whole collection lives in memory and is mirrored to a single JSON
//! file, rewritten atomically on every effective merge.

pub mod error;
pub mod papers;

pub use error::{Result, StoreError};
pub use papers::{ensure_data_dir, MergeOutcome, PaperStore};
