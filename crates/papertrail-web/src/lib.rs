//! papertrail-web — Minimal HTTP surface for the stored papers.
//!   - `/`          rendered paper list
//!   - `/papers`    raw JSON feed
//!   - `/style.css` stylesheet
//!
//! One connection is accepted and answered per poll; the caller decides
//! when to poll.

pub mod render;
pub mod response;
pub mod server;

pub use response::{Response, Status};
pub use server::{PollOutcome, RequestServer, ServerTimeouts};
