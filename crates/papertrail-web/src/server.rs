//! Single-connection request server.
//!
//! Each `poll_once` waits briefly for a client; timing out is the normal,
//! idle outcome. An accepted client gets exactly one bounded read, one
//! response and a closed connection.

use std::net::SocketAddr;
use std::time::Duration;

use papertrail_common::{Paper, PapertrailError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::response::{route, Response, Status};

const MAX_REQUEST_BYTES: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct ServerTimeouts {
    /// How long one poll waits for a client.
    pub accept: Duration,
    /// Bound on reading the request and writing the response.
    pub read: Duration,
}

impl Default for ServerTimeouts {
    fn default() -> Self {
        Self {
            accept: Duration::from_millis(100),
            read: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// No client connected within the accept timeout.
    Idle,
    /// One request was answered. `path` is `None` when the request could not be parsed.
    Served {
        peer: SocketAddr,
        path: Option<String>,
        status: Status,
    },
}

pub struct RequestServer {
    listener: TcpListener,
    timeouts: ServerTimeouts,
}

impl RequestServer {
    /// Bind `host:port`, or `host:fallback_port` if that fails. A second
    /// failure is returned to the caller.
    pub async fn bind(host: &str, port: u16, fallback_port: u16, timeouts: ServerTimeouts) -> Result<Self> {
        info!(%host, port, "Starting server");
        let listener = match TcpListener::bind((host, port)).await {
            Ok(listener) => listener,
            Err(e) => {
                warn!(port, error = %e, "Failed to start web server, trying alternative port {fallback_port}");
                TcpListener::bind((host, fallback_port)).await.map_err(|e| {
                    PapertrailError::Server(format!(
                        "could not bind {host}:{port} or fallback {host}:{fallback_port}: {e}"
                    ))
                })?
            }
        };

        let server = Self { listener, timeouts };
        info!(addr = %server.local_addr()?, "Web server started successfully");
        Ok(server)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and answer at most one request.
    ///
    /// Request-level failures become a 500 response; only an accept error
    /// other than the timeout is returned.
    pub async fn poll_once(&self, papers: &[Paper]) -> Result<PollOutcome> {
        let (stream, peer) = match timeout(self.timeouts.accept, self.listener.accept()).await {
            Err(_) => return Ok(PollOutcome::Idle),
            Ok(accepted) => accepted?,
        };
        info!(%peer, "Client connected");

        let (path, status) = self.handle_connection(stream, papers).await;
        Ok(PollOutcome::Served { peer, path, status })
    }

    async fn handle_connection(&self, mut stream: TcpStream, papers: &[Paper]) -> (Option<String>, Status) {
        let (path, response) = match self.read_request_path(&mut stream).await {
            Ok(path) => {
                let response = route(&path, papers);
                (Some(path), response)
            }
            Err(e) => {
                warn!(error = %e, "Error processing request");
                (None, Response::internal_error())
            }
        };

        let status = response.status;
        match timeout(self.timeouts.read, stream.write_all(&response.to_bytes())).await {
            Ok(Ok(())) => debug!(status = status.code(), "Response sent"),
            Ok(Err(e)) => warn!(error = %e, "Failed to send response"),
            Err(_) => warn!("Timed out sending response"),
        }
        // The stream is dropped (closed) on return even if shutdown fails.
        let _ = stream.shutdown().await;

        (path, status)
    }

    async fn read_request_path(&self, stream: &mut TcpStream) -> Result<String> {
        let mut buf = [0u8; MAX_REQUEST_BYTES];
        let n = timeout(self.timeouts.read, stream.read(&mut buf))
            .await
            .map_err(|_| PapertrailError::MalformedRequest("timed out reading request".to_string()))??;

        let request = std::str::from_utf8(&buf[..n])
            .map_err(|_| PapertrailError::MalformedRequest("request is not valid UTF-8".to_string()))?;
        let request_line = request.split("\r\n").next().unwrap_or_default();
        debug!(%request_line, "Received request");

        let (method, path) = parse_request_line(request_line)?;
        info!(%method, %path, "Processing request");
        Ok(path.to_string())
    }
}

/// Split `METHOD PATH VERSION`; anything else is malformed.
fn parse_request_line(line: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = line.split(' ').collect();
    match parts.as_slice() {
        [method, path, version] if !method.is_empty() && !path.is_empty() && !version.is_empty() => {
            Ok((method, path))
        }
        _ => Err(PapertrailError::MalformedRequest(format!("bad request line {line:?}"))),
    }
}
