//! Full-text derivation.
//!
//! Unlike hash and image, text is refreshed whenever the freshly extracted
//! value differs from the stored one, so a file replaced in place is
//! picked up on the next scan.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::blocking::run_blocking;
use crate::error::DeriveError;
use crate::extract::TextExtractor;

/// Returns the extracted text iff it differs from `current`.
pub async fn derive_text(
    extractor: Arc<dyn TextExtractor>,
    path: &Path,
    current: &Option<String>,
    limit: Duration,
) -> Result<Option<String>, DeriveError> {
    let owned = path.to_path_buf();
    let text = run_blocking("text extraction", limit, move || extractor.extract(&owned)).await?;

    if current.as_deref() == Some(text.as_str()) {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}
