//! Content hash derivation.
//!
//! Hashes are write-once: a record that already carries one is never
//! re-hashed, even if the file has since changed on disk.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::DeriveError;
use crate::models::is_present;

const READ_BUF_BYTES: usize = 64 * 1024;

/// Returns the hex SHA-256 of `path` when `current` is absent, `None` otherwise.
pub async fn derive_hash(
    path: &Path,
    current: &Option<String>,
) -> Result<Option<String>, DeriveError> {
    if is_present(current) {
        return Ok(None);
    }
    hash_file(path).await.map(Some)
}

/// Streams a file through SHA-256 and returns the lowercase hex digest.
pub async fn hash_file(path: &Path) -> Result<String, DeriveError> {
    let read_err = |source| DeriveError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::open(path).await.map_err(read_err)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUF_BYTES];
    loop {
        let n = file.read(&mut buf).await.map_err(read_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
