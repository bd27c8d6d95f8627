use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DbDriver {
    Mysql,
    Sqlite,
}

#[derive(Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_driver")]
    pub driver: DbDriver,
    /// `host:port` for MySQL; unused for SQLite.
    #[serde(default = "default_address")]
    pub address: String,
    /// Database name for MySQL, file path for SQLite.
    pub name: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Pool size. Defaults to `workers.concurrency`.
    #[serde(default)]
    pub max_connections: Option<u32>,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("driver", &self.driver)
            .field("address", &self.address)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

fn default_driver() -> DbDriver {
    DbDriver::Mysql
}
fn default_address() -> String {
    "db:3306".to_string()
}
fn default_acquire_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    #[serde(default = "default_image_prefix")]
    pub image_prefix: String,
}

fn default_image_prefix() -> String {
    "auto_".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            settle_delay_secs: default_settle_delay_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    3600
}
fn default_settle_delay_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkersConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}

fn default_concurrency() -> usize {
    8
}
fn default_operation_timeout_secs() -> u64 {
    120
}

impl Config {
    /// Database pool size; never smaller than the worker bound.
    pub fn pool_size(&self) -> u32 {
        self.db
            .max_connections
            .unwrap_or(self.workers.concurrency as u32)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.schedule.settle_delay_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.workers.operation_timeout_secs)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parses and validates a config, applying overrides from `env`.
///
/// Recognized variables: `DB_USER`, `DB_PASSWORD`, `DB_ADDRESS`, `DB_NAME`,
/// `STORAGE_ROOT`.
pub fn parse_config(content: &str, env: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if let Some(user) = env("DB_USER") {
        config.db.user = user;
    }
    if let Some(password) = env("DB_PASSWORD") {
        config.db.password = password;
    }
    if let Some(address) = env("DB_ADDRESS") {
        config.db.address = address;
    }
    if let Some(name) = env("DB_NAME") {
        config.db.name = name;
    }
    if let Some(root) = env("STORAGE_ROOT") {
        config.storage.root = PathBuf::from(root);
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.db.name.trim().is_empty() {
        bail!("db.name must not be empty");
    }
    if config.db.driver == DbDriver::Mysql && config.db.address.trim().is_empty() {
        bail!("db.address must not be empty for the mysql driver");
    }

    if config.storage.root.as_os_str().is_empty() {
        bail!("storage.root must not be empty");
    }
    let prefix = &config.storage.image_prefix;
    if prefix.is_empty() || prefix.contains('/') || prefix.contains('\\') {
        bail!(
            "storage.image_prefix must be non-empty and contain no path separators, got '{}'",
            prefix
        );
    }

    if config.schedule.interval_secs == 0 {
        bail!("schedule.interval_secs must be > 0");
    }

    if config.workers.concurrency == 0 {
        bail!("workers.concurrency must be > 0");
    }
    if config.workers.operation_timeout_secs == 0 {
        bail!("workers.operation_timeout_secs must be > 0");
    }

    if (config.pool_size() as usize) < config.workers.concurrency {
        bail!(
            "db.max_connections ({}) must be >= workers.concurrency ({})",
            config.pool_size(),
            config.workers.concurrency
        );
    }

    Ok(())
}
