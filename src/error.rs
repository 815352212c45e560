//! Error types for zipgrab.
//!
//! Every failure is terminal for the session that produced it: nothing here
//! is retried or downgraded to a warning. The binary turns these into a
//! one-line diagnostic and a failing exit status.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can happen while reading a remote archive.
#[derive(Error, Debug)]
pub enum Error {
    /// A single range request failed: network error, timeout, a server that
    /// ignores `Range`, or a malformed partial response.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The total size of the remote object could not be discovered.
    #[error("unable to determine remote length")]
    LengthUnknown {
        #[source]
        source: Box<Error>,
    },

    /// A read was requested past the end of the remote object.
    #[error("range {offset}+{size} exceeds object length {length}")]
    OutOfRange { offset: u64, size: u64, length: u64 },

    /// A range read failed in the underlying transport.
    #[error("range read of {size} bytes at offset {offset} failed")]
    RangeRead {
        offset: u64,
        size: u64,
        #[source]
        source: Box<Error>,
    },

    /// The archive structure is malformed or could not be read.
    #[error("invalid archive: {message}")]
    Catalog {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// The decompressed entry does not match its central directory checksum.
    #[error("checksum mismatch for {name}: expected {expected:08x}, got {actual:08x}")]
    Checksum {
        name: String,
        expected: u32,
        actual: u32,
    },

    /// No entry has exactly the requested name.
    #[error("unable to find file: {0}")]
    NotFound(String),

    /// Reading from the entry stream or writing to the sink failed mid-copy.
    #[error("copy failed after {transferred} bytes")]
    Copy {
        transferred: u64,
        #[source]
        source: Box<Error>,
    },

    /// The local output file could not be created.
    #[error("unable to create local file {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid combination of options.
    #[error("{0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn catalog(message: impl Into<String>) -> Self {
        Error::Catalog {
            message: message.into(),
            source: None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        Error::Transport {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
