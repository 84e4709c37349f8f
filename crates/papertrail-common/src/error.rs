use thiserror::Error;

#[derive(Debug, Error)]
pub enum PapertrailError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed returned status {status} for keyword '{keyword}'")]
    FeedStatus { keyword: String, status: u16 },

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PapertrailError>;
