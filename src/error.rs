//! Error taxonomy for reconciliation.
//!
//! Only [`CatalogError::Connectivity`] at startup is fatal. Everything a
//! derivation module or a single write can raise is recoverable: it is
//! logged at the per-record boundary and the record is retried next scan.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::extract::ExtractError;
use crate::models::Attribute;

/// Errors raised by the catalog access layer.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unreachable: {0}")]
    Connectivity(String),

    #[error("failed to write {attribute} for record {id}: {message}")]
    Write {
        id: i64,
        attribute: Attribute,
        message: String,
    },

    #[error("catalog operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors raised while deriving one attribute for one record.
#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("filesystem operation on {} failed: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} timed out after {limit:?}")]
    Timeout {
        operation: &'static str,
        limit: Duration,
    },

    #[error("path escapes the storage root: {0:?}")]
    PathEscape(String),
}

/// Coarse failure classes, used for per-scan accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    Read,
    Extraction,
    Filesystem,
    Write,
    Connectivity,
    Timeout,
    PathEscape,
    Panic,
}

impl DeriveError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DeriveError::Read { .. } => FailureKind::Read,
            DeriveError::Extraction(_) => FailureKind::Extraction,
            DeriveError::Filesystem { .. } => FailureKind::Filesystem,
            DeriveError::Timeout { .. } => FailureKind::Timeout,
            DeriveError::PathEscape(_) => FailureKind::PathEscape,
        }
    }
}

impl CatalogError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CatalogError::Connectivity(_) => FailureKind::Connectivity,
            CatalogError::Write { .. } => FailureKind::Write,
            CatalogError::Timeout(_) => FailureKind::Timeout,
        }
    }
}
