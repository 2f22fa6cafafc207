use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{DownloadError, Result};

pub const DEFAULT_BLOCK_COUNT: usize = 16;
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Settings for one download session. Built once, validated, then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    url: Url,
    target_path: PathBuf,
    block_count: usize,
    buffer_size: usize,
    durable: bool,
}

impl DownloadConfig {
    /// Parses `url` and resolves `target_path` against the current directory.
    pub fn new(url: &str, target_path: impl AsRef<Path>) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| DownloadError::InvalidConfig(format!("bad url {}: {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DownloadError::InvalidConfig(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }

        let target_path = target_path.as_ref();
        if target_path.as_os_str().is_empty() {
            return Err(DownloadError::InvalidConfig("empty target path".into()));
        }
        let target_path = if target_path.is_relative() {
            std::env::current_dir()?.join(target_path)
        } else {
            target_path.to_path_buf()
        };

        Ok(Self {
            url,
            target_path,
            block_count: DEFAULT_BLOCK_COUNT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            durable: true,
        })
    }

    pub fn with_block_count(mut self, block_count: usize) -> Result<Self> {
        if block_count == 0 {
            return Err(DownloadError::InvalidConfig("block count must be positive".into()));
        }
        self.block_count = block_count;
        Ok(self)
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(DownloadError::InvalidConfig("buffer size must be positive".into()));
        }
        self.buffer_size = buffer_size;
        Ok(self)
    }

    /// When false, writes are not followed by `sync_data`.
    pub fn with_durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn durable(&self) -> bool {
        self.durable
    }
}
