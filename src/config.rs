use chrono::TimeDelta;
use serde::Deserialize;

use crate::history_repo::RetentionPolicy;
use crate::sync_service::HistoryLimits;

const DEFAULT_CONFIG_FILE: &str = "config.toml";
/// Upper bound for `history.max_age_hours` (100 years).
const MAX_AGE_HOURS_LIMIT: u32 = 100 * 365 * 24;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

fn default_port() -> u16 {
    5001
}

fn default_host() -> String {
    "0.0.0.0".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionKind {
    /// Keep `max_records` most recent rows.
    Count,
    /// Keep rows newer than `max_age_hours`.
    Age,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_backend")]
    pub backend: HistoryBackend,
    /// SQLite file; ignored by the memory backend.
    #[serde(default = "default_history_path")]
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
    #[serde(default = "default_retention")]
    pub retention: RetentionKind,
    #[serde(default = "default_max_records")]
    pub max_records: u32,
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u32,
    /// Points returned by GET /history when no `limit` is given.
    #[serde(default = "default_query_limit")]
    pub query_limit: u32,
    /// Ceiling applied to a caller-supplied `limit`.
    #[serde(default = "default_max_query_limit")]
    pub max_query_limit: u32,
    /// Seed the counter cache from the newest history row at startup.
    #[serde(default = "default_restore_on_start")]
    pub restore_on_start: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_history_path(),
            max_pool_size: default_max_pool_size(),
            retention: default_retention(),
            max_records: default_max_records(),
            max_age_hours: default_max_age_hours(),
            query_limit: default_query_limit(),
            max_query_limit: default_max_query_limit(),
            restore_on_start: default_restore_on_start(),
        }
    }
}

fn default_backend() -> HistoryBackend {
    HistoryBackend::Sqlite
}

fn default_history_path() -> String {
    "data/history.db".into()
}

fn default_max_pool_size() -> u32 {
    4
}

fn default_retention() -> RetentionKind {
    RetentionKind::Count
}

fn default_max_records() -> u32 {
    500
}

fn default_max_age_hours() -> u32 {
    24
}

fn default_query_limit() -> u32 {
    50
}

fn default_max_query_limit() -> u32 {
    500
}

fn default_restore_on_start() -> bool {
    true
}

impl HistoryConfig {
    pub fn retention_policy(&self) -> RetentionPolicy {
        match self.retention {
            RetentionKind::Count => RetentionPolicy::MaxRecords(self.max_records),
            RetentionKind::Age => RetentionPolicy::MaxAge(
                TimeDelta::try_hours(i64::from(self.max_age_hours)).unwrap_or(TimeDelta::MAX),
            ),
        }
    }

    pub fn query_limits(&self) -> HistoryLimits {
        HistoryLimits {
            default_limit: self.query_limit,
            max_limit: self.max_query_limit,
        }
    }
}

/// Settings for the simulated device (`simulator` binary).
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Fixed delay between cycles while the server is reachable.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Per-request timeout for every outbound call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Cap for the doubling delay after consecutive failed updates. 0 disables backoff.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            interval_ms: default_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

fn default_server_url() -> String {
    "http://127.0.0.1:5001".into()
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_request_timeout_ms() -> u64 {
    2000
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

impl AppConfig {
    /// Read `CONFIG_FILE` (default `config.toml`), apply env overrides, validate.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str_with_env(&s)
    }

    /// Like [`load`](Self::load), but a missing file means "all defaults".
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(s) => Self::load_from_str_with_env(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path, "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_overrides(|k| std::env::var(k).ok())?;
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(anyhow::anyhow!("reading config {}: {}", path, e)),
        }
    }

    /// Parse and validate config from a string (e.g. for tests). No env overrides.
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_str_with_env(s: &str) -> anyhow::Result<Self> {
        let mut config: AppConfig = toml::from_str(s)?;
        config.apply_overrides(|k| std::env::var(k).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// `PORT` overrides `server.port`; `SERVER_URL` overrides `simulator.server_url`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("PORT must be a port number, got {:?}: {}", port, e))?;
        }
        if let Some(url) = lookup("SERVER_URL") {
            self.simulator.server_url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        if self.history.backend == HistoryBackend::Sqlite {
            anyhow::ensure!(
                !self.history.path.is_empty(),
                "history.path must be non-empty for the sqlite backend"
            );
        }
        anyhow::ensure!(
            self.history.max_pool_size > 0,
            "history.max_pool_size must be > 0, got {}",
            self.history.max_pool_size
        );
        anyhow::ensure!(
            self.history.max_records > 0,
            "history.max_records must be > 0, got {}",
            self.history.max_records
        );
        anyhow::ensure!(
            self.history.max_age_hours > 0 && self.history.max_age_hours <= MAX_AGE_HOURS_LIMIT,
            "history.max_age_hours must be between 1 and {}, got {}",
            MAX_AGE_HOURS_LIMIT,
            self.history.max_age_hours
        );
        anyhow::ensure!(
            self.history.query_limit > 0,
            "history.query_limit must be > 0, got {}",
            self.history.query_limit
        );
        anyhow::ensure!(
            self.history.max_query_limit >= self.history.query_limit,
            "history.max_query_limit must be >= history.query_limit ({}), got {}",
            self.history.query_limit,
            self.history.max_query_limit
        );
        anyhow::ensure!(
            self.simulator.server_url.starts_with("http://")
                || self.simulator.server_url.starts_with("https://"),
            "simulator.server_url must start with http:// or https://, got {:?}",
            self.simulator.server_url
        );
        anyhow::ensure!(
            self.simulator.interval_ms > 0,
            "simulator.interval_ms must be > 0, got {}",
            self.simulator.interval_ms
        );
        anyhow::ensure!(
            self.simulator.request_timeout_ms > 0,
            "simulator.request_timeout_ms must be > 0, got {}",
            self.simulator.request_timeout_ms
        );
        Ok(())
    }
}

fn config_path() -> String {
    std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into())
}
