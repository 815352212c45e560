//! Entry streams and bounded copies against in-memory archives.

use zip::CompressionMethod;
use zipgrab::{Catalog, EntryRead, Error, RemoteReader, StreamCopier};

mod common;
use common::*;

struct CopyOutcome {
    result: zipgrab::Result<u64>,
    sink: Vec<u8>,
    /// Range requests issued while opening and copying the entry.
    requests: Vec<(u64, u64)>,
}

async fn copy_entry(archive: Vec<u8>, name: &str, limit: Option<u64>) -> CopyOutcome {
    let reader = RemoteReader::new(MemoryTransport::new(archive));
    let catalog = Catalog::read(&reader).await.unwrap();
    let before = reader.transport().requests().len();

    let entry = catalog.find(name).unwrap();
    let mut stream = catalog.open(&reader, entry).await.unwrap();
    let mut sink = Vec::new();
    let result = StreamCopier::new(limit)
        .copy(&mut stream, &mut sink, entry.uncompressed_size)
        .await;

    CopyOutcome {
        result,
        sink,
        requests: reader.transport().requests()[before..].to_vec(),
    }
}

fn stored_and_deflated(data: &[u8]) -> Vec<u8> {
    build_zip(
        &[
            ("stored.bin", data, CompressionMethod::Stored),
            ("deflated.bin", data, CompressionMethod::Deflated),
        ],
        None,
    )
}

#[tokio::test]
async fn full_copy_matches_entry_content() {
    let (archive, b_bin) = fixture_archive();

    let outcome = copy_entry(archive.clone(), "b.bin", None).await;
    assert_eq!(outcome.result.unwrap(), B_BIN_SIZE as u64);
    assert_eq!(outcome.sink, b_bin);

    let outcome = copy_entry(archive, "a.txt", None).await;
    assert_eq!(outcome.result.unwrap(), 12);
    assert_eq!(outcome.sink, A_TXT);
}

#[tokio::test]
async fn full_copy_of_compressible_data() {
    let data: Vec<u8> = b"the quick brown fox jumps over the lazy dog\n"
        .iter()
        .copied()
        .cycle()
        .take(1_000_000)
        .collect();
    let archive = stored_and_deflated(&data);

    for name in ["stored.bin", "deflated.bin"] {
        let outcome = copy_entry(archive.clone(), name, None).await;
        assert_eq!(outcome.result.unwrap(), 1_000_000, "{name}");
        assert!(outcome.sink == data, "{name} content differs");
    }
}

#[tokio::test]
async fn limited_copy_stops_at_limit() {
    let data = noise(400_000);
    let archive = stored_and_deflated(&data);

    for name in ["stored.bin", "deflated.bin"] {
        for limit in [1, 1000, 131_072, 131_073, 262_144, 399_999] {
            let outcome = copy_entry(archive.clone(), name, Some(limit)).await;
            assert_eq!(outcome.result.unwrap(), limit, "{name} limit {limit}");
            assert_eq!(outcome.sink, &data[..limit as usize], "{name} limit {limit}");
        }
    }
}

#[tokio::test]
async fn limit_above_size_copies_whole_entry() {
    let (archive, _) = fixture_archive();

    let outcome = copy_entry(archive, "a.txt", Some(1000)).await;
    assert_eq!(outcome.result.unwrap(), 12);
    assert_eq!(outcome.sink, A_TXT);
}

#[tokio::test]
async fn limited_copy_fetches_only_what_it_needs() {
    let data = noise(400_000);
    let archive = stored_and_deflated(&data);

    // Stored data is fetched exactly: local header plus the capped bytes.
    let outcome = copy_entry(archive.clone(), "stored.bin", Some(1000)).await;
    assert_eq!(outcome.requests.len(), 2);
    assert_eq!(outcome.requests[0].1, 30);
    assert_eq!(outcome.requests[1].1, 1000);

    // Deflate input is fetched in bounded chunks.
    let outcome = copy_entry(archive, "deflated.bin", Some(1000)).await;
    let fetched: u64 = outcome.requests.iter().map(|(_, len)| len).sum();
    assert!(fetched < 100_000, "fetched {fetched} bytes");
}

#[tokio::test]
async fn progress_reaches_target() {
    let (archive, _) = fixture_archive();
    let reader = RemoteReader::new(MemoryTransport::new(archive));
    let catalog = Catalog::read(&reader).await.unwrap();
    let entry = catalog.find("b.bin").unwrap();
    let mut stream = catalog.open(&reader, entry).await.unwrap();
    let mut reports = Vec::new();

    let copied = StreamCopier::new(Some(300_000))
        .with_progress(|p| reports.push((p.transferred, p.percent(), p.finished)))
        .copy(&mut stream, &mut tokio::io::sink(), entry.uncompressed_size)
        .await
        .unwrap();

    assert_eq!(copied, 300_000);
    assert_eq!(
        reports,
        [(131_072, 43, false), (262_144, 87, false), (300_000, 100, true)]
    );
}

#[tokio::test]
async fn corrupt_stored_data_fails_checksum() {
    let mut archive = build_zip(&[("a.txt", A_TXT, CompressionMethod::Stored)], None);
    let data_at = archive
        .windows(A_TXT.len())
        .position(|w| w == A_TXT)
        .unwrap();
    archive[data_at] ^= 0x20;

    let outcome = copy_entry(archive, "a.txt", None).await;
    match outcome.result.unwrap_err() {
        Error::Copy { source, .. } => {
            assert!(matches!(*source, Error::Checksum { .. }), "{source:?}")
        }
        other => panic!("expected a copy error, got {other:?}"),
    }
}

#[tokio::test]
async fn entry_stream_reports_end_with_zero() {
    let archive = build_zip(&[("a.txt", A_TXT, CompressionMethod::Deflated)], None);
    let reader = RemoteReader::new(MemoryTransport::new(archive));
    let catalog = Catalog::read(&reader).await.unwrap();
    let entry = catalog.find("a.txt").unwrap();
    let mut stream = catalog.open(&reader, entry).await.unwrap();

    let mut out = Vec::new();
    let mut buf = [0u8; 5];
    loop {
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }

    assert_eq!(out, A_TXT);
    assert_eq!(stream.produced(), 12);
    assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn empty_entry_copies_nothing() {
    let archive = build_zip(&[("empty", b"", CompressionMethod::Deflated)], None);

    let outcome = copy_entry(archive, "empty", None).await;
    assert_eq!(outcome.result.unwrap(), 0);
    assert!(outcome.sink.is_empty());
}
