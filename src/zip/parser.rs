//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//!
//! Against a remote object every step is one range request near the tail,
//! so listing never touches entry data.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use tracing::debug;

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// ZIP64 extended information extra field id.
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Wrap a reader failure as a catalog error.
fn read_failed(what: &'static str) -> impl FnOnce(Error) -> Error {
    move |e| Error::Catalog {
        message: format!("unable to read {what}"),
        source: Some(Box::new(e)),
    }
}

/// Parser for the trailing structures of a ZIP archive.
pub struct ZipParser<'a, R: ReadAt> {
    /// The underlying data source
    reader: &'a R,
    /// Total size of the archive in bytes
    size: u64,
}

impl<'a, R: ReadAt> ZipParser<'a, R> {
    /// Create a parser, discovering the archive length through `reader`.
    pub async fn new(reader: &'a R) -> Result<Self> {
        let size = reader.length().await.map_err(read_failed("archive length"))?;

        if size < EndOfCentralDirectory::SIZE as u64 {
            return Err(Error::catalog(format!(
                "{size} bytes is too small to be a ZIP archive"
            )));
        }

        Ok(Self { reader, size })
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Returns the record and its offset in the archive.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        // Common case first: no archive comment, the record is the last 22 bytes.
        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let buf = self
            .reader
            .read_at(offset, EndOfCentralDirectory::SIZE)
            .await
            .map_err(read_failed("end of central directory"))?;

        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && buf[20..22] == [0u8, 0u8] {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        // The record is followed by a comment; scan backwards for it.
        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;
        debug!(search_start, search_size, "scanning for end of central directory");

        let buf = self
            .reader
            .read_at(search_start, search_size as usize)
            .await
            .map_err(read_failed("archive tail"))?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
                continue;
            }

            // The comment length must account for exactly the remaining bytes.
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
            if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                let eocd =
                    EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
                return Ok((eocd, search_start + i as u64));
            }
        }

        Err(Error::catalog("end of central directory not found"))
    }

    /// Read the ZIP64 End of Central Directory record that precedes the
    /// regular EOCD at `eocd_offset`.
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| Error::catalog("missing ZIP64 end of central directory locator"))?;

        let locator_buf = self
            .reader
            .read_at(locator_offset, Zip64EOCDLocator::SIZE)
            .await
            .map_err(read_failed("ZIP64 locator"))?;
        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        if locator.eocd64_offset.saturating_add(Zip64EOCD::MIN_SIZE as u64) > locator_offset {
            return Err(Error::catalog("ZIP64 end of central directory out of bounds"));
        }

        let eocd64_buf = self
            .reader
            .read_at(locator.eocd64_offset, Zip64EOCD::MIN_SIZE)
            .await
            .map_err(read_failed("ZIP64 end of central directory"))?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// Read every central directory record, in archive order.
    pub async fn read_entries(&self) -> Result<Vec<ZipFileEntry>> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset).await?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        if cd_offset.checked_add(cd_size).is_none_or(|end| end > eocd_offset) {
            return Err(Error::catalog(
                "central directory extends past the end of central directory record",
            ));
        }

        // Smallest possible header is 46 bytes; rejects absurd entry counts early.
        if total_entries.saturating_mul(CDFH_MIN_SIZE as u64) > cd_size {
            return Err(Error::catalog(format!(
                "{total_entries} entries cannot fit in a {cd_size} byte central directory"
            )));
        }

        debug!(cd_offset, cd_size, total_entries, "reading central directory");

        // The whole directory in one request.
        let cd_data = self
            .reader
            .read_at(cd_offset, cd_size as usize)
            .await
            .map_err(read_failed("central directory"))?;

        let mut entries = Vec::with_capacity(total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_ref());

        for index in 0..total_entries {
            let entry = parse_cdfh(&mut cursor)
                .map_err(|e| Error::catalog(format!("truncated central directory header {index}: {e}")))??;
            entries.push(entry);
        }

        Ok(entries)
    }
}

/// Parse a Central Directory File Header at the cursor position.
///
/// The outer error is a short read, the inner one a malformed header.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> std::io::Result<Result<ZipFileEntry>> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Ok(Err(Error::catalog(format!(
            "invalid central directory file header at offset {}",
            cursor.position() - 4
        ))));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let _flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();

    let mut extra = vec![0u8; extra_field_length as usize];
    cursor.read_exact(&mut extra)?;

    // Fields are only present in the ZIP64 extra block when saturated above.
    let mut extra_cursor = Cursor::new(extra.as_slice());
    while let (Ok(header_id), Ok(field_size)) = (
        extra_cursor.read_u16::<LittleEndian>(),
        extra_cursor.read_u16::<LittleEndian>(),
    ) {
        let field_end = extra_cursor.position() + field_size as u64;

        if header_id == ZIP64_EXTRA_ID {
            if uncompressed_size == 0xFFFFFFFF && extra_cursor.position() + 8 <= field_end {
                uncompressed_size = extra_cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && extra_cursor.position() + 8 <= field_end {
                compressed_size = extra_cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && extra_cursor.position() + 8 <= field_end {
                lfh_offset = extra_cursor.read_u64::<LittleEndian>()?;
            }
        }

        extra_cursor.set_position(field_end);
    }

    cursor.set_position(cursor.position() + file_comment_length as u64);

    Ok(Ok(ZipFileEntry {
        file_name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
    }))
}
