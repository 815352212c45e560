//! Bounded, chunked copy of one entry into a local sink.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{Error, Result};

/// Largest chunk read from the entry and written to the sink at once.
pub const DEFAULT_CHUNK_SIZE: u64 = 128 * 1024;

/// A readable stream of decompressed entry data.
#[async_trait]
pub trait EntryRead: Send {
    /// Read up to `buf.len()` bytes. `Ok(0)` with a non-empty buffer means
    /// the stream has ended.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Snapshot handed to the progress callback after every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub transferred: u64,
    pub target: u64,
    /// Set on the last report of a copy.
    pub finished: bool,
}

impl Progress {
    /// Whole percent of the target copied so far, truncated.
    pub fn percent(&self) -> u64 {
        if self.target == 0 {
            return 100;
        }
        (self.transferred as u128 * 100 / self.target as u128) as u64
    }
}

/// Number of bytes a copy will transfer: the entry size, capped by `limit`.
pub fn effective_target(uncompressed_size: u64, limit: Option<u64>) -> u64 {
    limit.map_or(uncompressed_size, |limit| limit.min(uncompressed_size))
}

/// Working buffer size for a copy of `target` bytes.
pub fn buffer_size(target: u64) -> usize {
    target.min(DEFAULT_CHUNK_SIZE) as usize
}

type ProgressFn<'p> = Box<dyn FnMut(&Progress) + Send + 'p>;

/// Copies an entry stream into a sink in bounded chunks.
///
/// ```ignore
/// let mut copier = StreamCopier::new(Some(1000)).with_progress(|p| println!("{}%", p.percent()));
/// let copied = copier.copy(&mut stream, &mut file, entry.uncompressed_size).await?;
/// ```
pub struct StreamCopier<'p> {
    limit: Option<u64>,
    progress: Option<ProgressFn<'p>>,
}

impl<'p> StreamCopier<'p> {
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit,
            progress: None,
        }
    }

    /// Call `f` after every chunk written.
    pub fn with_progress(mut self, f: impl FnMut(&Progress) + Send + 'p) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Copy the stream into `sink`, returning the number of bytes written.
    ///
    /// On failure the sink keeps whatever was written before the error.
    pub async fn copy<S, W>(&mut self, stream: &mut S, sink: &mut W, uncompressed_size: u64) -> Result<u64>
    where
        S: EntryRead + ?Sized,
        W: AsyncWrite + Unpin + Send,
    {
        let target = effective_target(uncompressed_size, self.limit);
        let mut buf = vec![0u8; buffer_size(target)];
        let mut transferred = 0u64;
        let failed = |transferred: u64| {
            move |e: Error| Error::Copy {
                transferred,
                source: Box::new(e),
            }
        };

        debug!(target_bytes = target, limit = ?self.limit, "starting copy");

        loop {
            // Land the last chunk exactly on the target.
            if transferred + DEFAULT_CHUNK_SIZE > target {
                buf.truncate((target - transferred) as usize);
            }

            let (n, eof) = fill(stream, &mut buf).await.map_err(failed(transferred))?;

            sink.write_all(&buf[..n])
                .await
                .map_err(|e| failed(transferred)(e.into()))?;
            transferred += n as u64;

            let finished = eof || transferred >= target;
            if let Some(report) = self.progress.as_mut() {
                report(&Progress {
                    transferred,
                    target,
                    finished,
                });
            }

            if finished {
                // A whole-entry copy reads on to the end so the stream can
                // check its size and checksum.
                if !eof && target == uncompressed_size {
                    let mut tail = [0u8; 1];
                    if stream.read(&mut tail).await.map_err(failed(transferred))? != 0 {
                        return Err(failed(transferred)(Error::catalog(
                            "entry data continues past its declared size",
                        )));
                    }
                }
                break;
            }
        }

        sink.flush().await.map_err(|e| failed(transferred)(e.into()))?;
        debug!(transferred, "copy complete");

        Ok(transferred)
    }
}

/// Read until `buf` is full or the stream ends; the flag reports the end.
async fn fill<S: EntryRead + ?Sized>(stream: &mut S, buf: &mut [u8]) -> Result<(usize, bool)> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]).await? {
            0 => return Ok((filled, true)),
            n => filled += n,
        }
    }
    Ok((filled, false))
}
