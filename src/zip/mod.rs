//! ZIP archive catalog and entry streams over random-access readers.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of the trailing records and central directory
//! - [`catalog`]: The parsed entry list, name lookup and listing
//! - [`stream`]: Decompressed data of a single entry
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read first, then the Central Directory, which allows listing
//! files without reading the entire archive.
//!
//! ## Supported Features
//!
//! - ZIP64 extensions for files > 4GB
//! - STORED and DEFLATE compression methods
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod catalog;
mod parser;
mod stream;
mod structures;

pub use catalog::{Catalog, Listing};
pub use parser::ZipParser;
pub use stream::EntryStream;
pub use structures::*;
