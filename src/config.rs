use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_COMMERCE_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SYNC_BATCH_LIMIT: u64 = 50;
const DEFAULT_SYNC_RECENCY_DAYS: i64 = 60;
const DEFAULT_SYNC_PAUSE_MS: u64 = 500;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 900;

/// External commerce platform settings.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CommerceConfig {
    /// Disabled entirely when false; transfer and reconciliation refuse to run.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_token: String,

    /// Upper bound on every external call; a timed-out call is a failure,
    /// never left pending.
    #[serde(default = "default_commerce_timeout")]
    pub timeout_secs: u64,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            api_token: String::new(),
            timeout_secs: default_commerce_timeout(),
        }
    }
}

/// Inbound reconciliation tuning.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Maximum orders considered per batch run.
    #[serde(default = "default_sync_batch_limit")]
    pub batch_limit: u64,

    /// Only orders updated within this many days are reconciled.
    #[serde(default = "default_sync_recency_days")]
    pub recency_days: i64,

    /// Pause between orders, respecting platform throughput limits.
    #[serde(default = "default_sync_pause_ms")]
    pub pause_ms: u64,

    /// Scheduler period for the background reconciliation loop.
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_limit: default_sync_batch_limit(),
            recency_days: default_sync_recency_days(),
            pause_ms: default_sync_pause_ms(),
            interval_secs: default_sync_interval_secs(),
        }
    }
}

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Server host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging).
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup.
    #[serde(default)]
    pub auto_migrate: bool,

    #[serde(default)]
    #[validate]
    pub commerce: CommerceConfig,

    #[serde(default)]
    #[validate]
    pub sync: SyncConfig,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_commerce_timeout() -> u64 {
    DEFAULT_COMMERCE_TIMEOUT_SECS
}
fn default_sync_batch_limit() -> u64 {
    DEFAULT_SYNC_BATCH_LIMIT
}
fn default_sync_recency_days() -> i64 {
    DEFAULT_SYNC_RECENCY_DAYS
}
fn default_sync_pause_ms() -> u64 {
    DEFAULT_SYNC_PAUSE_MS
}
fn default_sync_interval_secs() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

impl AppConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads configuration from `config/{environment}.toml` (optional) layered
/// under `APP__*` environment variables.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let config: AppConfig = Config::builder()
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, environment)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    config
        .validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

    info!(environment = %config.environment, "configuration loaded");
    Ok(config)
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
