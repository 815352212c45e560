//! Shared fixtures: in-memory archives, an in-memory transport and a
//! range-serving HTTP server.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};
use zipgrab::{Error, RangeResponse, RangeTransport, Result};

pub const ARCHIVE_PATH: &str = "/archive.zip";
pub const A_TXT: &[u8] = b"hello world\n";
pub const B_BIN_SIZE: usize = 500_000;

/// Deterministic bytes that do not compress.
pub fn noise(size: usize) -> Vec<u8> {
    let mut state = 0x2545_f491_4f6c_dd1du64;
    (0..size)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

/// Build a ZIP archive in memory.
pub fn build_zip(entries: &[(&str, &[u8], CompressionMethod)], comment: Option<&str>) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, method) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default().compression_method(*method))
            .unwrap();
        writer.write_all(data).unwrap();
    }
    if let Some(comment) = comment {
        writer.set_comment(comment);
    }
    writer.finish().unwrap().into_inner()
}

/// `a.txt` (12 bytes) and `b.bin` (500000 bytes), both deflated.
pub fn fixture_archive() -> (Vec<u8>, Vec<u8>) {
    let b_bin = noise(B_BIN_SIZE);
    let archive = build_zip(
        &[
            ("a.txt", A_TXT, CompressionMethod::Deflated),
            ("b.bin", &b_bin, CompressionMethod::Deflated),
        ],
        None,
    );
    (archive, b_bin)
}

/// Serves ranges of a byte vector and records every request.
pub struct MemoryTransport {
    data: Bytes,
    requests: Mutex<Vec<(u64, u64)>>,
    fail_after: Option<usize>,
}

impl MemoryTransport {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Bytes::from(data),
            requests: Mutex::new(Vec::new()),
            fail_after: None,
        }
    }

    /// Fail every request after the first `count`.
    pub fn failing_after(data: Vec<u8>, count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Self::new(data)
        }
    }

    pub fn requests(&self) -> Vec<(u64, u64)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn bytes_served(&self) -> u64 {
        self.requests().iter().map(|(_, len)| len).sum()
    }
}

#[async_trait]
impl RangeTransport for MemoryTransport {
    async fn fetch(&self, offset: u64, len: u64) -> Result<RangeResponse> {
        let mut requests = self.requests.lock().unwrap();
        if self.fail_after.is_some_and(|count| requests.len() >= count) {
            return Err(Error::Transport {
                message: "connection refused".to_string(),
                source: None,
            });
        }
        requests.push((offset, len));

        let start = offset as usize;
        let end = start + len as usize;
        if len == 0 || end > self.data.len() {
            return Err(Error::Transport {
                message: "HTTP request failed with status: 416 Range Not Satisfiable".to_string(),
                source: None,
            });
        }

        Ok(RangeResponse {
            data: self.data.slice(start..end),
            total_size: self.data.len() as u64,
        })
    }
}

/// Answers `Range: bytes=a-b` requests the way a static file server does.
pub struct RangeResponder {
    data: Arc<Vec<u8>>,
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let len = self.data.len();
        let Some(range) = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("bytes="))
        else {
            return ResponseTemplate::new(200).set_body_bytes(self.data.to_vec());
        };

        let (start, end) = range.split_once('-').unwrap();
        let start: usize = start.parse().unwrap();
        let end: usize = end.parse::<usize>().unwrap().min(len.saturating_sub(1));

        if start >= len || start > end {
            return ResponseTemplate::new(416)
                .insert_header("Content-Range", format!("bytes */{len}").as_str());
        }

        ResponseTemplate::new(206)
            .insert_header("Content-Range", format!("bytes {start}-{end}/{len}").as_str())
            .set_body_bytes(self.data[start..=end].to_vec())
    }
}

/// Start a server that serves `data` at [`ARCHIVE_PATH`] with Range support.
pub async fn range_server(data: Vec<u8>) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(RangeResponder {
            data: Arc::new(data),
        })
        .mount(&server)
        .await;
    server
}

pub fn archive_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), ARCHIVE_PATH)
}
