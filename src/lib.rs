//! # zipgrab
//!
//! Extract a single file from a ZIP archive hosted on an HTTP server without
//! downloading the archive.
//!
//! The remote object is treated as a random-access file: every read becomes
//! one HTTP Range request. Reading the central directory touches only the
//! tail of the archive, and copying an entry only fetches that entry's data,
//! stopping early when a byte limit is given.
//!
//! ## Example
//!
//! ```no_run
//! use zipgrab::{Config, RemoteArchive};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::list("https://example.com/archive.zip");
//!     let archive = RemoteArchive::open(&config).await?;
//!
//!     print!("{}", archive.catalog().listing());
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod copy;
pub mod error;
pub mod io;
pub mod progress;
pub mod zip;

pub use app::RemoteArchive;
pub use cli::Cli;
pub use config::{Config, ExtractRequest, Mode, Output};
pub use copy::{EntryRead, Progress, StreamCopier};
pub use error::{Error, Result};
pub use io::{HttpRangeTransport, RangeResponse, RangeTransport, ReadAt, RemoteReader};
pub use zip::{Catalog, EntryStream, ZipFileEntry};
