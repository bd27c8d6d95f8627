use anyhow::{Context, Result};
use sqlx::any::AnyPoolOptions;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::ConnectOptions;
use sqlx::AnyPool;
use std::time::Duration;

use crate::config::{Config, DbDriver};

/// Connection URL for the configured driver.
///
/// MySQL credentials go through [`MySqlConnectOptions`], which escapes
/// them for the URL.
pub fn database_url(config: &Config) -> Result<String> {
    let db = &config.db;
    match db.driver {
        DbDriver::Mysql => {
            let (host, port) = split_address(&db.address)?;
            let mut options = MySqlConnectOptions::new()
                .host(host)
                .port(port)
                .database(&db.name);
            if !db.user.is_empty() {
                options = options.username(&db.user).password(&db.password);
            }
            Ok(options.to_url_lossy().to_string())
        }
        DbDriver::Sqlite => Ok(format!("sqlite:{}?mode=rwc", db.name)),
    }
}

/// `host[:port]`, port defaulting to 3306.
fn split_address(address: &str) -> Result<(&str, u16)> {
    match address.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .with_context(|| format!("Invalid port in db.address '{}'", address))?;
            Ok((host, port))
        }
        None => Ok((address, 3306)),
    }
}

pub async fn connect(config: &Config) -> Result<AnyPool> {
    sqlx::any::install_default_drivers();

    if config.db.driver == DbDriver::Sqlite {
        // Ensure parent directory exists
        if let Some(parent) = std::path::Path::new(&config.db.name).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let pool = AnyPoolOptions::new()
        .max_connections(config.pool_size())
        .acquire_timeout(Duration::from_secs(config.db.acquire_timeout_secs))
        .connect(&database_url(config)?)
        .await
        .with_context(|| {
            format!(
                "Failed to connect to {:?} catalog '{}'",
                config.db.driver, config.db.name
            )
        })?;

    Ok(pool)
}
