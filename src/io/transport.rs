//! Single-shot HTTP byte-range requests.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode, Url};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// Body of a partial response together with the object size it declared.
#[derive(Debug, Clone)]
pub struct RangeResponse {
    pub data: Bytes,
    pub total_size: u64,
}

/// Something that can serve one byte window of a remote object per call.
///
/// Implementations must not retry: a failed fetch is reported as is.
#[async_trait]
pub trait RangeTransport: Send + Sync {
    /// Fetch `len` bytes starting at `offset`. `len` must be non-zero.
    async fn fetch(&self, offset: u64, len: u64) -> Result<RangeResponse>;
}

/// HTTP Range transport for remote objects
pub struct HttpRangeTransport {
    client: Client,
    url: Url,
    transferred_bytes: AtomicU64,
}

impl HttpRangeTransport {
    /// Create a transport for `url` whose requests each time out after
    /// `timeout`. `None` waits indefinitely.
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::Config(format!("invalid URL {url}: {e}")))?;

        let mut builder =
            Client::builder().user_agent(concat!("zipgrab/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            url,
            transferred_bytes: AtomicU64::new(0),
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RangeTransport for HttpRangeTransport {
    async fn fetch(&self, offset: u64, len: u64) -> Result<RangeResponse> {
        if len == 0 {
            return Err(Error::transport("empty range requested"));
        }

        let end = offset
            .checked_add(len - 1)
            .ok_or_else(|| Error::transport("range end overflows"))?;
        let range = format!("bytes={offset}-{end}");
        debug!(url = %self.url, %range, "sending range request");

        let resp = self
            .client
            .get(self.url.clone())
            .header(RANGE, &range)
            .send()
            .await?;

        match resp.status() {
            StatusCode::PARTIAL_CONTENT => {}
            StatusCode::OK => {
                return Err(Error::transport(
                    "remote server does not support Range requests",
                ));
            }
            status => {
                return Err(Error::transport(format!(
                    "HTTP request failed with status: {status}"
                )));
            }
        }

        let (start, _, total_size) = resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| Error::transport("missing or invalid Content-Range header"))?;

        if start != offset {
            return Err(Error::transport(format!(
                "server returned range starting at {start}, requested {offset}"
            )));
        }

        let data = resp.bytes().await?;
        self.transferred_bytes
            .fetch_add(data.len() as u64, Ordering::Relaxed);

        if data.len() as u64 != len {
            return Err(Error::transport(format!(
                "expected {len} bytes for {range}, received {}",
                data.len()
            )));
        }

        Ok(RangeResponse { data, total_size })
    }
}

/// Parse a `Content-Range: bytes start-end/total` header value.
///
/// An unknown total (`*`) is rejected since the caller needs the object size.
pub(crate) fn parse_content_range(value: &str) -> Option<(u64, u64, u64)> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;
    let (start, end) = range.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = end.trim().parse().ok()?;
    let total = total.trim().parse().ok()?;
    (start <= end && end < total).then_some((start, end, total))
}
