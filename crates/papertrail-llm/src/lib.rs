//! papertrail-llm — Remote summarization.
//!
//! `backend` talks to the Gemini `generateContent` endpoint; `summarizer`
//! wraps it so that callers always get a usable string back.

pub mod backend;
pub mod summarizer;

pub use backend::{GeminiBackend, LlmBackend, LlmError};
pub use summarizer::{RemoteSummarizer, Summarizer};
