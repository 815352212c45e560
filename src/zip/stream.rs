//! Decompressed data stream of a single entry.
//!
//! Compressed bytes are pulled from the reader on demand, so copying only
//! the first part of an entry only fetches the first part of its data.

use async_trait::async_trait;
use bytes::{Buf, Bytes};
use flate2::{Crc, Decompress, FlushDecompress, Status};

use crate::copy::EntryRead;
use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::structures::{CompressionMethod, ZipFileEntry};

/// Compressed bytes requested per range read when inflating.
const INPUT_CHUNK_SIZE: usize = 64 * 1024;

/// Window of compressed data that has not been consumed yet.
struct CompressedInput<'a, R: ReadAt> {
    reader: &'a R,
    offset: u64,
    remaining: u64,
    pending: Bytes,
}

impl<R: ReadAt> CompressedInput<'_, R> {
    /// Make sure `pending` holds data, fetching at most `max` bytes.
    ///
    /// Returns `false` once all compressed data has been consumed.
    async fn refill(&mut self, max: usize) -> Result<bool> {
        if !self.pending.is_empty() {
            return Ok(true);
        }
        if self.remaining == 0 {
            return Ok(false);
        }

        let len = self.remaining.min(max as u64) as usize;
        self.pending = self.reader.read_at(self.offset, len).await?;
        self.offset += len as u64;
        self.remaining -= len as u64;
        Ok(true)
    }
}

enum Decoder {
    Stored,
    Deflate(Box<Decompress>),
}

/// Reader over the uncompressed bytes of one entry.
///
/// At end of stream the output size and CRC-32 are checked against the
/// central directory.
pub struct EntryStream<'a, R: ReadAt> {
    input: CompressedInput<'a, R>,
    decoder: Decoder,
    name: String,
    uncompressed_size: u64,
    expected_crc: u32,
    crc: Crc,
    produced: u64,
    finished: bool,
}

impl<'a, R: ReadAt> EntryStream<'a, R> {
    pub(crate) fn new(reader: &'a R, entry: &ZipFileEntry, data_offset: u64) -> Self {
        let decoder = match entry.compression_method {
            CompressionMethod::Deflate => Decoder::Deflate(Box::new(Decompress::new(false))),
            _ => Decoder::Stored,
        };

        Self {
            input: CompressedInput {
                reader,
                offset: data_offset,
                remaining: entry.compressed_size,
                pending: Bytes::new(),
            },
            decoder,
            name: entry.file_name.clone(),
            uncompressed_size: entry.uncompressed_size,
            expected_crc: entry.crc32,
            crc: Crc::new(),
            produced: 0,
            finished: false,
        }
    }

    /// Uncompressed bytes produced so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    async fn read_stored(&mut self, buf: &mut [u8]) -> Result<(usize, bool)> {
        if !self.input.refill(buf.len()).await? {
            return Ok((0, true));
        }

        let n = self.input.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.input.pending[..n]);
        self.input.pending.advance(n);

        let done = self.input.remaining == 0 && self.input.pending.is_empty();
        Ok((n, done))
    }

    async fn read_deflate(&mut self, buf: &mut [u8]) -> Result<(usize, bool)> {
        let Decoder::Deflate(inflater) = &mut self.decoder else {
            return Err(Error::catalog("entry is not deflate compressed"));
        };

        loop {
            let has_input = self.input.refill(INPUT_CHUNK_SIZE).await?;

            let before_in = inflater.total_in();
            let before_out = inflater.total_out();
            let status = inflater
                .decompress(&self.input.pending, buf, FlushDecompress::None)
                .map_err(|e| {
                    Error::catalog(format!("corrupt deflate data in {}: {e}", self.name))
                })?;
            let consumed = (inflater.total_in() - before_in) as usize;
            let written = (inflater.total_out() - before_out) as usize;
            self.input.pending.advance(consumed);

            if status == Status::StreamEnd {
                return Ok((written, true));
            }
            if written > 0 {
                return Ok((written, false));
            }
            if consumed == 0 {
                let reason = if has_input { "stalled" } else { "truncated" };
                return Err(Error::catalog(format!(
                    "deflate stream of {} is {reason}",
                    self.name
                )));
            }
        }
    }

    fn verify(&self) -> Result<()> {
        if self.produced != self.uncompressed_size {
            return Err(Error::catalog(format!(
                "{} decompressed to {} bytes, expected {}",
                self.name, self.produced, self.uncompressed_size
            )));
        }

        let actual = self.crc.sum();
        if actual != self.expected_crc {
            return Err(Error::Checksum {
                name: self.name.clone(),
                expected: self.expected_crc,
                actual,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl<R: ReadAt> EntryRead for EntryStream<'_, R> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.finished || buf.is_empty() {
            return Ok(0);
        }

        let (n, done) = match self.decoder {
            Decoder::Stored => self.read_stored(buf).await?,
            Decoder::Deflate(_) => self.read_deflate(buf).await?,
        };

        self.crc.update(&buf[..n]);
        self.produced += n as u64;

        if self.produced > self.uncompressed_size {
            return Err(Error::catalog(format!(
                "{} is larger than its declared {} bytes",
                self.name, self.uncompressed_size
            )));
        }

        if done {
            self.finished = true;
            self.verify()?;
        }

        Ok(n)
    }
}
