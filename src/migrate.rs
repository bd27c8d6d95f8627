use anyhow::Result;
use sqlx::AnyPool;

use crate::config::Config;
use crate::db;

/// Column types valid in both MySQL and SQLite.
const CREATE_PUBLICATIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS publications (
        id BIGINT NOT NULL PRIMARY KEY,
        title TEXT,
        author TEXT,
        year BIGINT,
        keyword TEXT,
        abstract TEXT,
        path VARCHAR(1024) NOT NULL,
        type VARCHAR(64),
        path_zip VARCHAR(1024),
        hash_zip VARCHAR(128),
        path_img VARCHAR(1024),
        path_url VARCHAR(1024),
        password VARCHAR(255),
        text LONGTEXT,
        hash VARCHAR(128),
        updated_at BIGINT
    )
"#;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates the `publications` table if it does not exist. Idempotent.
pub async fn create_schema(pool: &AnyPool) -> Result<()> {
    sqlx::query(CREATE_PUBLICATIONS).execute(pool).await?;
    Ok(())
}
