//! Configuration loading for Papertrail.
//! Reads papertrail.toml from the current directory or the path in PAPERTRAIL_CONFIG.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use papertrail_ingestion::sources::arxiv::ARXIV_QUERY_URL;
use papertrail_llm::backend::{DEFAULT_GEMINI_MODEL, GEMINI_BASE_URL};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "PAPERTRAIL_CONFIG";
pub const GEMINI_KEY_ENV: &str = "PAPERTRAIL_GEMINI_API_KEY";
const DEFAULT_CONFIG_PATH: &str = "papertrail.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: u64,
}

fn default_restart_delay() -> u64 { 10 }

impl Default for Config {
    fn default() -> Self {
        Self {
            feed:               FeedConfig::default(),
            llm:                LlmConfig::default(),
            server:             ServerConfig::default(),
            storage:            StorageConfig::default(),
            restart_delay_secs: default_restart_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_feed_url")]
    pub base_url: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_max_papers")]
    pub max_papers: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_keywords()        -> Vec<String> { vec!["robotics".to_string()] }
fn default_feed_url()        -> String { ARXIV_QUERY_URL.to_string() }
fn default_check_interval()  -> u64    { 3600 }
fn default_max_papers()      -> usize  { 50 }
fn default_request_timeout() -> u64    { 30 }

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            keywords:             default_keywords(),
            base_url:             default_feed_url(),
            check_interval_secs:  default_check_interval(),
            max_papers:           default_max_papers(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Gemini key. Empty means "read PAPERTRAIL_GEMINI_API_KEY".
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_url")]
    pub base_url: String,
    #[serde(default = "default_throttle")]
    pub throttle_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_llm_model() -> String { DEFAULT_GEMINI_MODEL.to_string() }
fn default_llm_url()   -> String { GEMINI_BASE_URL.to_string() }
fn default_throttle()  -> u64    { 5 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key:              String::new(),
            model:                default_llm_model(),
            base_url:             default_llm_url(),
            throttle_secs:        default_throttle(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "[REDACTED]" })
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("throttle_secs", &self.throttle_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl LlmConfig {
    /// The configured key, else the environment fallback. `None` disables summaries.
    pub fn api_key(&self) -> Option<SecretString> {
        resolve_api_key(&self.api_key, std::env::var(GEMINI_KEY_ENV).ok())
    }
}

fn resolve_api_key(configured: &str, from_env: Option<String>) -> Option<SecretString> {
    let key = if configured.trim().is_empty() {
        from_env.unwrap_or_default()
    } else {
        configured.to_string()
    };
    let key = key.trim();
    (!key.is_empty()).then(|| SecretString::from(key.to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_fallback_port")]
    pub fallback_port: u16,
    #[serde(default = "default_accept_timeout")]
    pub accept_timeout_ms: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_loop_sleep")]
    pub loop_sleep_ms: u64,
}

fn default_host()           -> String { "0.0.0.0".to_string() }
fn default_port()           -> u16    { 80 }
fn default_fallback_port()  -> u16    { 8080 }
fn default_accept_timeout() -> u64    { 100 }
fn default_read_timeout()   -> u64    { 3000 }
fn default_loop_sleep()     -> u64    { 50 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host:              default_host(),
            port:              default_port(),
            fallback_port:     default_fallback_port(),
            accept_timeout_ms: default_accept_timeout(),
            read_timeout_ms:   default_read_timeout(),
            loop_sleep_ms:     default_loop_sleep(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_papers_path")]
    pub papers_path: String,
}

fn default_papers_path() -> String { "papers/papers.json".to_string() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { papers_path: default_papers_path() }
    }
}


impl Config {
    /// Load configuration from papertrail.toml.
    /// Checks PAPERTRAIL_CONFIG first, then the current directory. A missing
    /// file yields the defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Invalid config file {}: {e}", path.display()))?
        } else {
            tracing::warn!(
                "Config file not found: {}. Using defaults; copy papertrail.example.toml to papertrail.toml to customise.",
                path.display()
            );
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.feed.keywords.iter().all(|k| k.trim().is_empty()) {
            anyhow::bail!("feed.keywords must contain at least one keyword");
        }
        if self.feed.max_papers == 0 {
            anyhow::bail!("feed.max_papers must be greater than zero");
        }
        Ok(())
    }

    /// Configured keywords, trimmed, blanks removed.
    pub fn keywords(&self) -> Vec<String> {
        self.feed
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn check_interval(&self) -> Duration { Duration::from_secs(self.feed.check_interval_secs) }
    pub fn feed_timeout(&self)   -> Duration { Duration::from_secs(self.feed.request_timeout_secs) }
    pub fn llm_timeout(&self)    -> Duration { Duration::from_secs(self.llm.request_timeout_secs) }
    pub fn throttle(&self)       -> Duration { Duration::from_secs(self.llm.throttle_secs) }
    pub fn loop_sleep(&self)     -> Duration { Duration::from_millis(self.server.loop_sleep_ms) }
    pub fn restart_delay(&self)  -> Duration { Duration::from_secs(self.restart_delay_secs) }

    pub fn server_timeouts(&self) -> papertrail_web::ServerTimeouts {
        papertrail_web::ServerTimeouts {
            accept: Duration::from_millis(self.server.accept_timeout_ms),
            read:   Duration::from_millis(self.server.read_timeout_ms),
        }
    }
}
