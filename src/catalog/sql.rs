//! SQL-backed [`Catalog`] over a `sqlx` [`AnyPool`].
//!
//! The same queries run against MySQL in production and SQLite locally;
//! both accept `?` placeholders and the portable column types created by
//! [`crate::migrate`].

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::{AnyPool, Row};
use tracing::debug;

use super::Catalog;
use crate::error::CatalogError;
use crate::models::{Attribute, DocumentRecord};

const SELECT_ALL: &str = r#"
    SELECT id, title, author, year, keyword, abstract, path, type,
           path_zip, hash_zip, path_img, path_url, password, text, hash
    FROM publications
    ORDER BY id
"#;

#[derive(Clone)]
pub struct SqlCatalog {
    pool: AnyPool,
}

impl SqlCatalog {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

/// Reads a nullable text column.
///
/// MySQL sends `TEXT`/`LONGTEXT` columns as blobs, which `Any` will not
/// decode as `String`; those arrive as bytes and must be valid UTF-8.
fn text_column(row: &AnyRow, column: &str) -> Result<Option<String>, sqlx::Error> {
    match row.try_get::<Option<String>, _>(column) {
        Ok(value) => Ok(value),
        Err(sqlx::Error::ColumnDecode { .. }) => {
            let bytes: Option<Vec<u8>> = row.try_get(column)?;
            bytes
                .map(String::from_utf8)
                .transpose()
                .map_err(|e| sqlx::Error::ColumnDecode {
                    index: column.to_string(),
                    source: Box::new(e),
                })
        }
        Err(e) => Err(e),
    }
}

fn record_from_row(row: &AnyRow) -> Result<DocumentRecord, sqlx::Error> {
    Ok(DocumentRecord {
        id: row.try_get("id")?,
        title: text_column(row, "title")?,
        author: text_column(row, "author")?,
        year: row.try_get("year")?,
        keyword: text_column(row, "keyword")?,
        abstract_text: text_column(row, "abstract")?,
        path: text_column(row, "path")?.unwrap_or_default(),
        doc_type: text_column(row, "type")?,
        archive_path: text_column(row, "path_zip")?,
        archive_hash: text_column(row, "hash_zip")?,
        image_path: text_column(row, "path_img")?,
        access_url: text_column(row, "path_url")?,
        password: text_column(row, "password")?,
        text: text_column(row, "text")?,
        hash: text_column(row, "hash")?,
    })
}

#[async_trait]
impl Catalog for SqlCatalog {
    async fn ping(&self) -> Result<(), CatalogError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| CatalogError::Connectivity(e.to_string()))?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<DocumentRecord>, CatalogError> {
        let rows = sqlx::query(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CatalogError::Connectivity(e.to_string()))?;

        rows.iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CatalogError::Connectivity(format!("malformed publications row: {}", e)))
    }

    async fn update_attribute(
        &self,
        id: i64,
        attribute: Attribute,
        value: &str,
    ) -> Result<(), CatalogError> {
        // Column names come from a closed enum, never from input.
        let sql = format!("UPDATE publications SET {} = ? WHERE id = ?", attribute.column());
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| CatalogError::Write {
                id,
                attribute,
                message: e.to_string(),
            })?;

        if result.rows_affected() == 0 {
            debug!(record_id = id, %attribute, "update matched no rows");
        }
        Ok(())
    }
}
