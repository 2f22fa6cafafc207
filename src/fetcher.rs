use std::io;
use std::sync::Arc;

use futures::TryStreamExt;
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, RequestBuilder, StatusCode};
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::{DownloadError, Result};
use crate::slice::Slice;
use crate::writer::SyncWriter;

/// Hook applied to every slice request before the `Range` header is set.
pub type RequestCustomizer = Arc<dyn Fn(RequestBuilder) -> RequestBuilder + Send + Sync>;

/// Shared, read-only inputs of every fetcher spawned by one job.
pub(crate) struct FetchContext {
    pub client: Client,
    pub url: Url,
    pub writer: Arc<SyncWriter>,
    pub buffer_size: usize,
    pub customizer: Option<RequestCustomizer>,
    pub token: CancellationToken,
}

/// Downloads the missing tail of `slice` and commits it through the writer.
///
/// Returns `Ok(())` early when the job is cancelled.
pub(crate) async fn fetch_slice(ctx: Arc<FetchContext>, slice: Arc<Slice>) -> Result<()> {
    if slice.is_complete() || ctx.token.is_cancelled() {
        return Ok(());
    }

    let range = slice.range_header();
    debug!(slice = slice.index(), %range, "requesting slice");

    let mut request = ctx.client.get(ctx.url.clone());
    if let Some(customize) = &ctx.customizer {
        request = customize(request);
    }
    let request = request.header(header::RANGE, &range);

    let response = tokio::select! {
        biased;
        _ = ctx.token.cancelled() => return Ok(()),
        response = request.send() => response?,
    };
    let response = response.error_for_status()?;
    if response.status() != StatusCode::PARTIAL_CONTENT {
        return Err(DownloadError::InvalidResponse(format!(
            "expected 206 Partial Content for {}, got {}",
            range,
            response.status()
        )));
    }
    let served_from = content_range_start(response.headers());
    if served_from != Some(slice.next_offset()) {
        return Err(DownloadError::InvalidResponse(format!(
            "requested {} but Content-Range starts at {:?}",
            range, served_from
        )));
    }

    let body = response.bytes_stream().map_err(io::Error::other);
    let reader = StreamReader::new(body);
    tokio::pin!(reader);
    let mut buffer = vec![0u8; ctx.buffer_size];

    loop {
        let n = tokio::select! {
            biased;
            _ = ctx.token.cancelled() => return Ok(()),
            n = reader.read(&mut buffer) => n?,
        };
        if n == 0 {
            break;
        }
        if !ctx.writer.commit(&slice, &buffer[..n], &ctx.token).await? {
            return Ok(());
        }
    }

    if !slice.is_complete() {
        return Err(DownloadError::InvalidResponse(format!(
            "body for {} ended after {} of {} bytes",
            range,
            slice.downloaded(),
            slice.len()
        )));
    }

    debug!(slice = slice.index(), bytes = slice.len(), "slice complete");
    Ok(())
}

/// First byte of a `Content-Range: bytes <start>-<end>/<total>` header.
fn content_range_start(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(header::CONTENT_RANGE)?.to_str().ok()?;
    let range = value.trim().strip_prefix("bytes ")?;
    let (start, _) = range.split_once('-')?;
    start.trim().parse().ok()
}
