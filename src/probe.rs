use reqwest::header::{HeaderMap, ACCEPT_RANGES, CONTENT_LENGTH};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::{DownloadError, Result};

/// What the preflight HEAD response says about the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteFileInfo {
    pub content_length: Option<u64>,
    pub support_range_download: bool,
}

impl RemoteFileInfo {
    pub fn new(headers: &HeaderMap) -> Self {
        let support_range_download = headers
            .get(ACCEPT_RANGES)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().eq_ignore_ascii_case("bytes"))
            .unwrap_or(false);
        // Read the header directly: the body size hint of a HEAD response is 0.
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        Self {
            content_length,
            support_range_download,
        }
    }
}

/// Sends the HEAD request and returns the resource size.
pub async fn head(client: &Client, url: &Url) -> Result<u64> {
    let response = client.head(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::InvalidResponse(format!("HEAD {} returned {}", url, status)));
    }

    let info = RemoteFileInfo::new(response.headers());
    debug!(%url, ?info, "preflight response");
    if !info.support_range_download {
        return Err(DownloadError::NotSupported { url: url.to_string() });
    }
    match info.content_length {
        Some(length) if length > 0 => Ok(length),
        Some(_) => Err(DownloadError::InvalidResponse(format!("{} reports zero content length", url))),
        None => Err(DownloadError::InvalidResponse(format!("{} has no valid content length", url))),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_parse_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1000000"));
        let info = RemoteFileInfo::new(&headers);
        assert!(info.support_range_download);
        assert_eq!(info.content_length, Some(1_000_000));
    }

    #[test]
    fn test_missing_or_bad_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("none"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("abc"));
        let info = RemoteFileInfo::new(&headers);
        assert!(!info.support_range_download);
        assert_eq!(info.content_length, None);

        let info = RemoteFileInfo::new(&HeaderMap::new());
        assert!(!info.support_range_download);
        assert_eq!(info.content_length, None);
    }
}
