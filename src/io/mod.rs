mod remote;
mod transport;

pub use remote::RemoteReader;
pub use transport::{HttpRangeTransport, RangeResponse, RangeTransport};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read exactly `size` bytes starting at `offset`.
    ///
    /// Fails instead of returning short data when the window extends past
    /// the end of the source.
    async fn read_at(&self, offset: u64, size: usize) -> Result<Bytes>;

    /// Get the total size of the data source
    async fn length(&self) -> Result<u64>;
}
