use indicatif::DecimalBytes;
use std::fmt;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::parser::ZipParser;
use super::stream::EntryStream;
use super::structures::{CompressionMethod, LFH_SIGNATURE, LFH_SIZE, ZipFileEntry};

/// The parsed central directory of one archive.
///
/// Built once from a reader and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<ZipFileEntry>,
}

impl Catalog {
    /// Parse the central directory of the archive behind `reader`.
    pub async fn read<R: ReadAt>(reader: &R) -> Result<Self> {
        let parser = ZipParser::new(reader).await?;
        let entries = parser.read_entries().await?;
        debug!(entries = entries.len(), "parsed central directory");
        Ok(Self { entries })
    }

    /// Entries in archive order.
    pub fn entries(&self) -> &[ZipFileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry whose name is exactly `name`.
    ///
    /// Comparison is case-sensitive with no path normalization. If an archive
    /// holds the same name twice the first one wins.
    pub fn find(&self, name: &str) -> Result<&ZipFileEntry> {
        let mut matches = self.entries.iter().filter(|e| e.file_name == name);
        let found = matches
            .next()
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        if matches.next().is_some() {
            warn!(name, "archive contains duplicate entries, using the first");
        }

        Ok(found)
    }

    /// Names and uncompressed sizes of every entry, with the archive total.
    pub fn listing(&self) -> Listing<'_> {
        let total_uncompressed = self.entries.iter().map(|e| e.uncompressed_size).sum();
        Listing {
            entries: &self.entries,
            total_uncompressed,
        }
    }

    /// Open the decompressed data stream of `entry`.
    ///
    /// Reads the entry's local header to find where its data starts.
    pub async fn open<'a, R: ReadAt>(
        &self,
        reader: &'a R,
        entry: &ZipFileEntry,
    ) -> Result<EntryStream<'a, R>> {
        match entry.compression_method {
            CompressionMethod::Stored if entry.compressed_size != entry.uncompressed_size => {
                return Err(Error::catalog(format!(
                    "stored entry {} has mismatched sizes",
                    entry.file_name
                )));
            }
            CompressionMethod::Stored | CompressionMethod::Deflate => {}
            CompressionMethod::Unknown(method) => {
                return Err(Error::catalog(format!(
                    "unsupported compression method {method} for {}",
                    entry.file_name
                )));
            }
        }

        let lfh = reader
            .read_at(entry.lfh_offset, LFH_SIZE)
            .await
            .map_err(|e| Error::Catalog {
                message: format!("unable to read local header of {}", entry.file_name),
                source: Some(Box::new(e)),
            })?;

        if &lfh[0..4] != LFH_SIGNATURE {
            return Err(Error::catalog(format!(
                "invalid local file header for {}",
                entry.file_name
            )));
        }

        // Name and extra lengths may differ from the central directory copy.
        let file_name_length = u16::from_le_bytes([lfh[26], lfh[27]]) as u64;
        let extra_field_length = u16::from_le_bytes([lfh[28], lfh[29]]) as u64;
        let data_offset = entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length;

        debug!(name = %entry.file_name, data_offset, "opened entry");
        Ok(EntryStream::new(reader, entry, data_offset))
    }
}

/// Listing of a catalog: every entry's name and size plus a grand total.
#[derive(Debug, Clone, Copy)]
pub struct Listing<'a> {
    entries: &'a [ZipFileEntry],
    total_uncompressed: u64,
}

impl<'a> Listing<'a> {
    pub fn entries(&self) -> impl Iterator<Item = (&'a str, u64)> + 'a {
        self.entries
            .iter()
            .map(|e| (e.file_name.as_str(), e.uncompressed_size))
    }

    pub fn total_uncompressed(&self) -> u64 {
        self.total_uncompressed
    }
}

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, size) in self.entries() {
            writeln!(f, "{:>6} \t {}", DecimalBytes(size).to_string(), name)?;
        }
        writeln!(f, "------")?;
        writeln!(f, "{:>6}", DecimalBytes(self.total_uncompressed).to_string())
    }
}
