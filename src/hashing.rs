use std::path::Path;

use futures::TryStreamExt;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::error::{DownloadError, Result};

/// Lowercase hex SHA-256 of the file at `filepath`.
pub async fn calculate_hash(filepath: impl AsRef<Path>) -> Result<String> {
    let file = File::open(filepath.as_ref()).await?;
    let digest = ReaderStream::with_capacity(file, 64 * 1024)
        .try_fold(Sha256::new(), |mut hasher, chunk| async move {
            hasher.update(&chunk);
            Ok(hasher)
        })
        .await?;
    Ok(hex::encode(digest.finalize()))
}

/// Compares the file digest with `expected`, ignoring case.
pub async fn verify_hash(filepath: impl AsRef<Path>, expected: &str) -> Result<String> {
    let computed = calculate_hash(filepath).await?;
    if !expected.trim().eq_ignore_ascii_case(&computed) {
        return Err(DownloadError::InvalidResponse(format!(
            "hash mismatch: expected {}, got {}",
            expected, computed
        )));
    }
    Ok(computed)
}
