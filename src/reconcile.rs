//! Per-record reconciliation.
//!
//! Runs every derivation for one record in sequence and writes back only
//! what is missing or changed. Failures of one derivation are logged and
//! counted; they never stop the others and never escape this module.

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::derive_hash::derive_hash;
use crate::derive_image::ImageSelector;
use crate::derive_text::derive_text;
use crate::error::{CatalogError, DeriveError, FailureKind};
use crate::extract::{DocumentTextExtractor, TextExtractor};
use crate::models::{is_present, Attribute, DocumentRecord};
use crate::pdf_images::{ImageExtractor, PdfImageExtractor};

/// What one reconciliation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordReport {
    pub id: i64,
    pub written: Vec<Attribute>,
    pub failures: Vec<FailureKind>,
}

impl RecordReport {
    fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Joins `relative` onto `root`, refusing anything that could leave `root`.
///
/// The check is lexical: absolute paths, drive prefixes and `..`
/// components are rejected without touching the filesystem.
pub fn resolve_path(root: &Path, relative: &str) -> Result<PathBuf, DeriveError> {
    if relative.trim().is_empty() {
        return Err(DeriveError::PathEscape(relative.to_string()));
    }
    let rel = Path::new(relative);
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(DeriveError::PathEscape(relative.to_string()));
            }
        }
    }
    Ok(root.join(rel))
}

pub struct Reconciler {
    catalog: Arc<dyn Catalog>,
    text_extractor: Arc<dyn TextExtractor>,
    images: ImageSelector,
    storage_root: PathBuf,
    timeout: Duration,
}

impl Reconciler {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        text_extractor: Arc<dyn TextExtractor>,
        image_extractor: Arc<dyn ImageExtractor>,
        storage_root: impl Into<PathBuf>,
        image_prefix: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            text_extractor,
            images: ImageSelector::new(image_extractor, image_prefix, timeout),
            storage_root: storage_root.into(),
            timeout,
        }
    }

    /// Reconciler wired with the built-in PDF/DOCX extractors.
    pub fn with_default_extractors(
        catalog: Arc<dyn Catalog>,
        storage_root: impl Into<PathBuf>,
        image_prefix: &str,
        timeout: Duration,
    ) -> Self {
        Self::new(
            catalog,
            Arc::new(DocumentTextExtractor),
            Arc::new(PdfImageExtractor),
            storage_root,
            image_prefix,
            timeout,
        )
    }

    pub async fn reconcile(&self, record: &DocumentRecord) -> RecordReport {
        let mut report = RecordReport::new(record.id);

        self.reconcile_archive_hash(record, &mut report).await;

        let source = match resolve_path(&self.storage_root, &record.path) {
            Ok(p) => p,
            Err(e) => {
                self.note_failure(record.id, None, &e, &mut report);
                return report;
            }
        };

        if let Err(source_err) = tokio::fs::metadata(&source).await {
            let e = DeriveError::Read {
                path: source,
                source: source_err,
            };
            self.note_failure(record.id, None, &e, &mut report);
            return report;
        }

        // Hash
        match self
            .bounded("hashing", derive_hash(&source, &record.hash))
            .await
        {
            Ok(Some(hash)) => self.write(record.id, Attribute::Hash, &hash, &mut report).await,
            Ok(None) => {}
            Err(e) => self.note_failure(record.id, Some(Attribute::Hash), &e, &mut report),
        }

        // Text
        match derive_text(
            Arc::clone(&self.text_extractor),
            &source,
            &record.text,
            self.timeout,
        )
        .await
        {
            Ok(Some(text)) => self.write(record.id, Attribute::Text, &text, &mut report).await,
            Ok(None) => {}
            Err(e) => self.note_failure(record.id, Some(Attribute::Text), &e, &mut report),
        }

        // Image
        match self
            .images
            .derive(&self.storage_root, Path::new(&record.path), &record.image_path)
            .await
        {
            Ok(Some(image)) => {
                self.write(record.id, Attribute::ImagePath, &image, &mut report)
                    .await
            }
            Ok(None) => {}
            Err(e) => self.note_failure(record.id, Some(Attribute::ImagePath), &e, &mut report),
        }

        report
    }

    async fn reconcile_archive_hash(&self, record: &DocumentRecord, report: &mut RecordReport) {
        let Some(archive) = record.archive_path.as_deref().filter(|p| !p.is_empty()) else {
            return;
        };
        if is_present(&record.archive_hash) {
            return;
        }

        let result = match resolve_path(&self.storage_root, archive) {
            Ok(path) => self.bounded("archive hashing", derive_hash(&path, &None)).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(Some(hash)) => {
                self.write(record.id, Attribute::ArchiveHash, &hash, report)
                    .await
            }
            Ok(None) => {}
            Err(e) => self.note_failure(record.id, Some(Attribute::ArchiveHash), &e, report),
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, DeriveError>>,
    ) -> Result<T, DeriveError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .unwrap_or(Err(DeriveError::Timeout {
                operation,
                limit: self.timeout,
            }))
    }

    async fn write(&self, id: i64, attribute: Attribute, value: &str, report: &mut RecordReport) {
        let result = tokio::time::timeout(
            self.timeout,
            self.catalog.update_attribute(id, attribute, value),
        )
        .await
        .unwrap_or(Err(CatalogError::Timeout(self.timeout)));

        match result {
            Ok(()) => {
                info!(record_id = id, %attribute, "updated");
                report.written.push(attribute);
            }
            Err(e) => {
                warn!(record_id = id, %attribute, error = %e, "write failed");
                report.failures.push(e.kind());
            }
        }
    }

    fn note_failure(
        &self,
        id: i64,
        attribute: Option<Attribute>,
        error: &DeriveError,
        report: &mut RecordReport,
    ) {
        let attribute = attribute.map(|a| a.column()).unwrap_or("record");
        match error {
            DeriveError::Extraction(e) if e.is_unsupported() => {
                debug!(record_id = id, attribute, error = %error, "skipped");
                return;
            }
            _ => warn!(record_id = id, attribute, error = %error, "derivation failed"),
        }
        report.failures.push(error.kind());
    }
}
