use clap::Parser;

use crate::config::{Config, ExtractRequest, Mode, Output, timeout_from_secs};
use crate::error::{Error, Result};

#[derive(Parser, Debug)]
#[command(name = "zipgrab")]
#[command(version)]
#[command(about = "Extract one file from a remote ZIP archive using HTTP Range requests", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipgrab -u https://example.com/archive.zip -l              list files in the remote ZIP\n  \
  zipgrab -u https://example.com/archive.zip -r data/b.bin   extract data/b.bin to ./b.bin\n  \
  zipgrab -u https://example.com/archive.zip -r log.txt -b 4096 -o - | less")]
pub struct Cli {
    /// The url you wish to download from
    #[arg(short = 'u', value_name = "URL")]
    pub url: String,

    /// The remote filename to download
    #[arg(short = 'r', value_name = "NAME")]
    pub remote_file: Option<String>,

    /// The output filename ("-" for stdout, default: base name of the remote file)
    #[arg(short = 'o', value_name = "PATH")]
    pub output: Option<String>,

    /// Timeout for each request, in seconds (0 = no timeout)
    #[arg(short = 't', value_name = "SECONDS", default_value_t = 5)]
    pub timeout: u64,

    /// Show a progress bar
    #[arg(short = 'v')]
    pub verbose: bool,

    /// List files in the zip and exit
    #[arg(short = 'l')]
    pub list: bool,

    /// Limit the number of bytes downloaded (0 = no limit)
    #[arg(short = 'b', value_name = "BYTES", default_value_t = 0)]
    pub limit_bytes: u64,
}

impl Cli {
    pub fn into_config(self) -> Result<Config> {
        let mode = if self.list {
            Mode::List
        } else {
            let remote_file = self
                .remote_file
                .ok_or_else(|| Error::Config("You must specify a remote filename".to_string()))?;
            let output = match self.output {
                Some(output) => Output::parse(&output),
                None => Output::for_entry(&remote_file)?,
            };

            Mode::Extract(ExtractRequest {
                remote_file,
                output,
                limit: (self.limit_bytes != 0).then_some(self.limit_bytes),
                verbose: self.verbose,
            })
        };

        Ok(Config {
            url: self.url,
            timeout: timeout_from_secs(self.timeout),
            mode,
        })
    }
}
