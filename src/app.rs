//! A remote archive opened for listing or extraction.

use std::pin::Pin;
use tokio::fs;
use tokio::io::AsyncWrite;
use tracing::{debug, info};

use crate::config::{Config, ExtractRequest, Output};
use crate::copy::StreamCopier;
use crate::error::{Error, Result};
use crate::io::{HttpRangeTransport, ReadAt, RemoteReader};
use crate::progress::ProgressLine;
use crate::zip::Catalog;

/// A remote archive whose central directory has been read.
pub struct RemoteArchive<R: ReadAt> {
    reader: R,
    catalog: Catalog,
}

impl RemoteArchive<RemoteReader<HttpRangeTransport>> {
    /// Connect to `config.url` and read the archive's central directory.
    pub async fn open(config: &Config) -> Result<Self> {
        let transport = HttpRangeTransport::new(&config.url, config.timeout)?;
        Self::from_reader(RemoteReader::new(transport)).await
    }

    /// Bytes received from the network so far.
    pub fn transferred_bytes(&self) -> u64 {
        self.reader.transport().transferred_bytes()
    }
}

impl<R: ReadAt> RemoteArchive<R> {
    pub async fn from_reader(reader: R) -> Result<Self> {
        let length = reader.length().await?;
        debug!(length, "archive length");
        let catalog = Catalog::read(&reader).await?;
        Ok(Self { reader, catalog })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Extract one entry as described by `request`, returning the bytes written.
    ///
    /// The output file is created before the entry is looked up, and is left
    /// in place, possibly truncated, if anything afterwards fails.
    pub async fn extract(&self, request: &ExtractRequest) -> Result<u64> {
        let mut sink: Pin<Box<dyn AsyncWrite + Send>> = match &request.output {
            Output::Stdout => Box::pin(tokio::io::stdout()),
            Output::File(path) => {
                let file = fs::File::create(path)
                    .await
                    .map_err(|source| Error::Output {
                        path: path.clone(),
                        source,
                    })?;
                Box::pin(file)
            }
        };

        let entry = self.catalog.find(&request.remote_file)?;
        let mut stream = self.catalog.open(&self.reader, entry).await?;

        let mut copier = StreamCopier::new(request.limit);
        if request.verbose {
            let mut line = ProgressLine::stderr();
            copier = copier.with_progress(move |progress| {
                if let Err(e) = line.report(progress) {
                    debug!(error = %e, "unable to draw progress");
                }
            });
        }

        let copied = copier
            .copy(&mut stream, &mut sink, entry.uncompressed_size)
            .await?;
        info!(name = %entry.file_name, copied, "extracted entry");

        Ok(copied)
    }
}

/// One-line diagnostic naming the extraction stage that produced `err`.
pub fn failure_context(request: &ExtractRequest, err: &Error) -> String {
    match err {
        Error::Output { path, .. } => format!("Unable to create local file: {}", path.display()),
        Error::NotFound(name) => format!("Unable to find file: {name} in zip"),
        _ => format!("Unable to read file {} from zip", request.remote_file),
    }
}
