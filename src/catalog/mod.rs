//! Catalog access layer.
//!
//! The [`Catalog`] trait is the only way the reconciler touches the
//! publication store: one full read per scan, one single-column update per
//! derived attribute. It is constructed once and injected, so tests can
//! swap in [`memory::MemoryCatalog`].
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`ping`](Catalog::ping) | Startup connectivity check |
//! | [`list_all`](Catalog::list_all) | Read every record for one scan |
//! | [`update_attribute`](Catalog::update_attribute) | Write one attribute of one record |

pub mod memory;
pub mod sql;

use async_trait::async_trait;

use crate::error::CatalogError;
use crate::models::{Attribute, DocumentRecord};

pub use memory::MemoryCatalog;
pub use sql::SqlCatalog;

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Verify the store is reachable.
    async fn ping(&self) -> Result<(), CatalogError>;

    /// Read every record.
    ///
    /// Strict snapshot isolation is not required: rows may reflect writes
    /// made after the read began.
    async fn list_all(&self) -> Result<Vec<DocumentRecord>, CatalogError>;

    /// Set one derived attribute of one record.
    ///
    /// Updating a record that no longer exists is not an error.
    async fn update_attribute(
        &self,
        id: i64,
        attribute: Attribute,
        value: &str,
    ) -> Result<(), CatalogError>;
}
