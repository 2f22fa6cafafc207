use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{DownloadError, Result};
use crate::slice::Slice;

/// Owns the output file and serializes every seek+write pair on it.
///
/// The file is opened on first use and stays open for the life of the
/// writer, so a paused session can be started again on the same handle.
pub struct SyncWriter {
    path: PathBuf,
    durable: bool,
    file: Mutex<Option<File>>,
}

impl SyncWriter {
    pub fn new(path: impl Into<PathBuf>, durable: bool) -> Self {
        Self {
            path: path.into(),
            durable,
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `bytes` at the absolute `offset`.
    pub async fn write_at(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let mut slot = self.file.lock().await;
        let file = self.open(&mut slot).await?;
        write_locked(file, offset, bytes, self.durable).await
    }

    /// Appends `bytes` to `slice` at its next offset and advances its
    /// progress, both under the lock.
    ///
    /// Returns `Ok(false)` without writing when `token` was cancelled before
    /// the lock was acquired.
    pub async fn commit(&self, slice: &Slice, bytes: &[u8], token: &CancellationToken) -> Result<bool> {
        let mut slot = self.file.lock().await;
        if token.is_cancelled() {
            return Ok(false);
        }

        let len = bytes.len() as u64;
        if len > slice.remaining() {
            return Err(DownloadError::InvalidResponse(format!(
                "slice {} received {} bytes with only {} remaining",
                slice.index(),
                len,
                slice.remaining()
            )));
        }

        let file = self.open(&mut slot).await?;
        write_locked(file, slice.next_offset(), bytes, self.durable).await?;
        slice.advance(len);
        Ok(true)
    }

    async fn open<'a>(&self, slot: &'a mut Option<File>) -> Result<&'a mut File> {
        if slot.is_none() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(&self.path)
                .await?;
            *slot = Some(file);
        }
        slot.as_mut()
            .ok_or_else(|| DownloadError::Io(io::Error::other("output file not open")))
    }
}

async fn write_locked(file: &mut File, offset: u64, bytes: &[u8], durable: bool) -> Result<()> {
    file.seek(SeekFrom::Start(offset)).await?;
    file.write_all(bytes).await?;
    if durable {
        file.sync_data().await?;
    } else {
        file.flush().await?;
    }
    Ok(())
}
