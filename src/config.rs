//! Settings for one invocation, passed explicitly to the components that
//! need them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Per-request timeout used when none is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-request timeout from a number of seconds; `0` disables the timeout.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs != 0).then(|| Duration::from_secs(secs))
}

/// Where extracted bytes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

impl Output {
    /// `-` means standard output, anything else is a file path.
    pub fn parse(value: &str) -> Self {
        if value == "-" {
            Output::Stdout
        } else {
            Output::File(PathBuf::from(value))
        }
    }

    /// Default destination for an entry: its base name in the working directory.
    pub fn for_entry(name: &str) -> Result<Self> {
        Path::new(name)
            .file_name()
            .map(|base| Output::File(PathBuf::from(base)))
            .ok_or_else(|| Error::Config(format!("cannot derive an output file name from {name}")))
    }
}

/// Which entry to extract, where to, and how much of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    pub remote_file: String,
    pub output: Output,
    /// Cap on the number of uncompressed bytes copied.
    pub limit: Option<u64>,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Print the archive contents and exit.
    List,
    Extract(ExtractRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub url: String,
    /// `None` means requests never time out.
    pub timeout: Option<Duration>,
    pub mode: Mode,
}

impl Config {
    pub fn list(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Some(DEFAULT_TIMEOUT),
            mode: Mode::List,
        }
    }

    /// Extract `remote_file` to its base name with no limit.
    pub fn extract(url: impl Into<String>, remote_file: impl Into<String>) -> Result<Self> {
        let remote_file = remote_file.into();
        let output = Output::for_entry(&remote_file)?;
        Ok(Self {
            url: url.into(),
            timeout: Some(DEFAULT_TIMEOUT),
            mode: Mode::Extract(ExtractRequest {
                remote_file,
                output,
                limit: None,
                verbose: false,
            }),
        })
    }
}
