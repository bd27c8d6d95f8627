//! In-memory [`Catalog`] implementation for tests and dry runs.
//!
//! Records live in a `BTreeMap` behind `std::sync::RwLock`; every accepted
//! update is applied to the stored record and appended to a write log so
//! callers can assert exactly which writes a scan issued.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use super::Catalog;
use crate::error::CatalogError;
use crate::models::{Attribute, DocumentRecord};

/// One update received by a [`MemoryCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub id: i64,
    pub attribute: Attribute,
    pub value: String,
}

#[derive(Default)]
pub struct MemoryCatalog {
    records: RwLock<BTreeMap<i64, DocumentRecord>>,
    writes: Mutex<Vec<WriteRecord>>,
    failing_ids: RwLock<HashSet<i64>>,
    unreachable: AtomicBool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = DocumentRecord>) -> Self {
        let catalog = Self::new();
        for r in records {
            catalog.insert(r);
        }
        catalog
    }

    pub fn insert(&self, record: DocumentRecord) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert(record.id, record);
    }

    pub fn get(&self, id: i64) -> Option<DocumentRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get(&id).cloned()
    }

    /// All updates received so far, in arrival order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Make every update for `id` fail with a write error.
    pub fn fail_writes_for(&self, id: i64) {
        let mut failing = self.failing_ids.write().unwrap_or_else(|e| e.into_inner());
        failing.insert(id);
    }

    /// Simulate losing the connection to the store.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), CatalogError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CatalogError::Connectivity(
                "in-memory catalog marked unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn ping(&self) -> Result<(), CatalogError> {
        self.check_reachable()
    }

    async fn list_all(&self) -> Result<Vec<DocumentRecord>, CatalogError> {
        self.check_reachable()?;
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records.values().cloned().collect())
    }

    async fn update_attribute(
        &self,
        id: i64,
        attribute: Attribute,
        value: &str,
    ) -> Result<(), CatalogError> {
        self.check_reachable()?;
        let failing = self
            .failing_ids
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&id);
        if failing {
            return Err(CatalogError::Write {
                id,
                attribute,
                message: "injected write failure".to_string(),
            });
        }

        if let Some(record) = self
            .records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&id)
        {
            record.set_attribute(attribute, value);
        }
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(WriteRecord {
                id,
                attribute,
                value: value.to_string(),
            });
        Ok(())
    }
}
