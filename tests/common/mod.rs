#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pubrecon::catalog::{Catalog, MemoryCatalog};
use pubrecon::dispatch::Dispatcher;
use pubrecon::error::CatalogError;
use pubrecon::extract::{ExtractError, TextExtractor};
use pubrecon::models::{Attribute, DocumentRecord};
use pubrecon::pdf_images::{ImageCandidate, ImageExtractor};
use pubrecon::reconcile::Reconciler;
use tempfile::TempDir;

pub const LIMIT: Duration = Duration::from_secs(10);

/// Returns the file's own contents as its "text".
pub struct ContentsAsText;

impl TextExtractor for ContentsAsText {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        std::fs::read_to_string(path).map_err(|e| ExtractError::Io(e.to_string()))
    }
}

/// Writes one candidate per configured size.
pub struct SizedImages(pub Vec<usize>);

impl ImageExtractor for SizedImages {
    fn extract_images(
        &self,
        _source: &Path,
        out_dir: &Path,
    ) -> Result<Vec<ImageCandidate>, ExtractError> {
        let mut out = Vec::new();
        for (i, size) in self.0.iter().enumerate() {
            let path = out_dir.join(format!("cand{}.png", i));
            std::fs::write(&path, vec![0u8; *size]).map_err(|e| ExtractError::Io(e.to_string()))?;
            out.push(ImageCandidate {
                path,
                size: *size as u64,
            });
        }
        Ok(out)
    }
}

/// Tracks how many extractions run at once.
#[derive(Default)]
pub struct ConcurrencyGauge {
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
}

impl TextExtractor for ConcurrencyGauge {
    fn extract(&self, _path: &Path) -> Result<String, ExtractError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(25));
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok("gauge".to_string())
    }
}

/// A storage root with one file per record: `docs/<id>.pdf` holding `body <id>`.
pub struct Library {
    pub dir: TempDir,
}

impl Library {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn add(&self, id: i64) -> DocumentRecord {
        let rel = format!("docs/{}.pdf", id);
        std::fs::write(self.dir.path().join(&rel), format!("body {}", id)).unwrap();
        DocumentRecord::new(id, rel)
    }

    pub fn write(&self, rel: &str, contents: &[u8]) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}

pub fn reconciler(
    catalog: Arc<dyn Catalog>,
    root: PathBuf,
    text: Arc<dyn TextExtractor>,
    images: Arc<dyn ImageExtractor>,
) -> Arc<Reconciler> {
    Arc::new(Reconciler::new(catalog, text, images, root, "auto_", LIMIT))
}

pub fn dispatcher(
    catalog: Arc<dyn Catalog>,
    root: PathBuf,
    text: Arc<dyn TextExtractor>,
    images: Arc<dyn ImageExtractor>,
    concurrency: usize,
) -> Dispatcher {
    let r = reconciler(Arc::clone(&catalog), root, text, images);
    Dispatcher::new(catalog, r, concurrency, LIMIT)
}

/// Wraps a [`MemoryCatalog`]; `list_all` blocks until the gate opens.
pub struct GatedCatalog {
    pub inner: MemoryCatalog,
    pub gate: tokio::sync::Semaphore,
    pub lists: AtomicUsize,
}

impl GatedCatalog {
    pub fn new(inner: MemoryCatalog) -> Self {
        Self {
            inner,
            gate: tokio::sync::Semaphore::new(0),
            lists: AtomicUsize::new(0),
        }
    }

    pub fn open(&self) {
        self.gate.add_permits(tokio::sync::Semaphore::MAX_PERMITS / 2);
    }
}

#[async_trait]
impl Catalog for GatedCatalog {
    async fn ping(&self) -> Result<(), CatalogError> {
        self.inner.ping().await
    }

    async fn list_all(&self) -> Result<Vec<DocumentRecord>, CatalogError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| CatalogError::Connectivity(e.to_string()))?;
        permit.forget();
        self.inner.list_all().await
    }

    async fn update_attribute(
        &self,
        id: i64,
        attribute: Attribute,
        value: &str,
    ) -> Result<(), CatalogError> {
        self.inner.update_attribute(id, attribute, value).await
    }
}

/// Panics when asked to write anything for `poisoned`.
pub struct PanickyCatalog {
    pub inner: MemoryCatalog,
    pub poisoned: i64,
}

#[async_trait]
impl Catalog for PanickyCatalog {
    async fn ping(&self) -> Result<(), CatalogError> {
        self.inner.ping().await
    }

    async fn list_all(&self) -> Result<Vec<DocumentRecord>, CatalogError> {
        self.inner.list_all().await
    }

    async fn update_attribute(
        &self,
        id: i64,
        attribute: Attribute,
        value: &str,
    ) -> Result<(), CatalogError> {
        if id == self.poisoned {
            panic!("storage driver bug for record {}", id);
        }
        self.inner.update_attribute(id, attribute, value).await
    }
}
