use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{RangeTransport, ReadAt};
use crate::error::{Error, Result};

/// Random access over a remote object, one range request per read.
///
/// The object length is discovered on first use and never changes for the
/// lifetime of the reader. There is no read-ahead and no caching of data.
pub struct RemoteReader<T: RangeTransport> {
    transport: T,
    length: OnceCell<u64>,
}

impl<T: RangeTransport> RemoteReader<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            length: OnceCell::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: RangeTransport> ReadAt for RemoteReader<T> {
    async fn read_at(&self, offset: u64, size: usize) -> Result<Bytes> {
        let length = self.length().await?;
        let size = size as u64;

        if offset.checked_add(size).is_none_or(|end| end > length) {
            return Err(Error::OutOfRange {
                offset,
                size,
                length,
            });
        }

        if size == 0 {
            return Ok(Bytes::new());
        }

        let resp = self
            .transport
            .fetch(offset, size)
            .await
            .map_err(|e| Error::RangeRead {
                offset,
                size,
                source: Box::new(e),
            })?;

        if resp.total_size != length {
            return Err(Error::RangeRead {
                offset,
                size,
                source: Box::new(Error::transport(format!(
                    "remote length changed from {length} to {}",
                    resp.total_size
                ))),
            });
        }

        Ok(resp.data)
    }

    async fn length(&self) -> Result<u64> {
        self.length
            .get_or_try_init(|| async {
                // Any partial response declares the total size; ask for one byte.
                let resp = self
                    .transport
                    .fetch(0, 1)
                    .await
                    .map_err(|e| Error::LengthUnknown {
                        source: Box::new(e),
                    })?;
                debug!(length = resp.total_size, "discovered remote length");
                Ok::<_, Error>(resp.total_size)
            })
            .await
            .copied()
    }
}
