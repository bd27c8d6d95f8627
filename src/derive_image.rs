//! Representative image selection.
//!
//! Image paths are write-once: once set, by an earlier pass or by hand,
//! the selector leaves the record alone. Candidates are extracted into a
//! scratch directory next to the source file, the largest one is moved
//! beside the source under a recognizable prefix, and the scratch
//! directory is removed on every exit path when its guard drops.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use crate::blocking::run_blocking;
use crate::error::DeriveError;
use crate::models::is_present;
use crate::pdf_images::{ImageCandidate, ImageExtractor};

/// Prefix for the scratch directory created beside each source file.
const SCRATCH_PREFIX: &str = ".pubrecon-img-";

pub struct ImageSelector {
    extractor: Arc<dyn ImageExtractor>,
    prefix: String,
    limit: Duration,
}

impl ImageSelector {
    pub fn new(
        extractor: Arc<dyn ImageExtractor>,
        prefix: impl Into<String>,
        limit: Duration,
    ) -> Self {
        Self {
            extractor,
            prefix: prefix.into(),
            limit,
        }
    }

    /// Selects and installs an image for the file at `root/relative`.
    ///
    /// Returns the new image path relative to `root`, or `None` when the
    /// record already has one or the source holds no images.
    pub async fn derive(
        &self,
        root: &Path,
        relative: &Path,
        current: &Option<String>,
    ) -> Result<Option<String>, DeriveError> {
        if is_present(current) {
            return Ok(None);
        }

        let source = root.join(relative);
        let record_dir = source.parent().unwrap_or(root).to_path_buf();

        let scratch = self.create_scratch(&record_dir).await?;

        // The scratch guard travels with the extraction so it is dropped only
        // after the extractor returns, even when the caller has timed out.
        let extractor = Arc::clone(&self.extractor);
        let src = source.clone();
        let (scratch, candidates) = run_blocking("image extraction", self.limit, move || {
            let candidates = extractor.extract_images(&src, scratch.path())?;
            Ok((scratch, candidates))
        })
        .await?;

        let Some(best) = select_largest(&candidates) else {
            return Ok(None);
        };

        let file_name = self.generated_name(&source, &best.path);
        let dest = record_dir.join(&file_name);
        tokio::time::timeout(self.limit, tokio::fs::rename(&best.path, &dest))
            .await
            .map_err(|_| DeriveError::Timeout {
                operation: "image install",
                limit: self.limit,
            })?
            .map_err(|source| DeriveError::Filesystem {
                path: dest.clone(),
                source,
            })?;
        drop(scratch);

        Ok(Some(relative_string(&relative.with_file_name(&file_name))))
    }

    async fn create_scratch(&self, record_dir: &Path) -> Result<TempDir, DeriveError> {
        let dir = record_dir.to_path_buf();
        let create = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(SCRATCH_PREFIX)
                .tempdir_in(&dir)
        });
        let joined = tokio::time::timeout(self.limit, create)
            .await
            .map_err(|_| DeriveError::Timeout {
                operation: "scratch directory",
                limit: self.limit,
            })?;
        joined
            .map_err(std::io::Error::other)
            .and_then(|created| created)
            .map_err(|source| DeriveError::Filesystem {
                path: record_dir.to_path_buf(),
                source,
            })
    }

    /// `<prefix><source stem>.<candidate extension>`
    fn generated_name(&self, source: &Path, candidate: &Path) -> String {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let ext = candidate
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "img".to_string());
        format!("{}{}.{}", self.prefix, stem, ext)
    }
}

/// Largest candidate by byte size; ties go to the first encountered.
pub fn select_largest(candidates: &[ImageCandidate]) -> Option<&ImageCandidate> {
    candidates.iter().fold(None, |best, c| match best {
        Some(b) if b.size >= c.size => Some(b),
        _ => Some(c),
    })
}

/// Catalog paths use `/` separators regardless of platform.
fn relative_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
