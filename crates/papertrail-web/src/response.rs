//! HTTP/1.1 responses and path routing.

use papertrail_common::Paper;
use tracing::warn;

use crate::render::{render_index, STYLE_CSS};

pub const NOT_FOUND_HTML: &str =
    "<html><body><h1>404 Not Found</h1><p>The requested resource was not found.</p></body></html>";
pub const INTERNAL_ERROR_HTML: &str =
    "<html><body><h1>500 Internal Server Error</h1><p>An error occurred while processing your request.</p></body></html>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    InternalServerError,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok                  => 200,
            Status::NotFound            => 404,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok                  => "OK",
            Status::NotFound            => "Not Found",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn ok(content_type: &'static str, body: impl Into<String>) -> Self {
        Self { status: Status::Ok, content_type, body: body.into() }
    }

    pub fn not_found() -> Self {
        Self { status: Status::NotFound, content_type: "text/html", body: NOT_FOUND_HTML.to_string() }
    }

    pub fn internal_error() -> Self {
        Self {
            status: Status::InternalServerError,
            content_type: "text/html",
            body: INTERNAL_ERROR_HTML.to_string(),
        }
    }

    /// Status line, headers and body. `Content-Length` counts bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nConnection: close\r\nContent-Length: {}\r\n\r\n",
            self.status.code(),
            self.status.reason(),
            self.content_type,
            self.body.len()
        );
        let mut bytes = Vec::with_capacity(head.len() + self.body.len());
        bytes.extend_from_slice(head.as_bytes());
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

/// Dispatch on the exact request path.
pub fn route(path: &str, papers: &[Paper]) -> Response {
    match path {
        "/" => Response::ok("text/html", render_index(papers)),
        "/papers" => match serde_json::to_string(papers) {
            Ok(json) => Response::ok("application/json", json),
            Err(e) => {
                warn!(error = %e, "Failed to serialize papers");
                Response::internal_error()
            }
        },
        "/style.css" => Response::ok("text/css", STYLE_CSS),
        _ => Response::not_found(),
    }
}
