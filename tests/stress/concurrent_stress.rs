//! Concurrent session stress tests
//!
//! Many sessions share one server at the same time, each limited by its
//! own concurrency setting.

use std::time::Instant;

use chunkstream_upload::backend::MemoryBackend;
use chunkstream_upload::chunk::FileHasher;
use chunkstream_upload::{smart_upload, MemorySource, Metadata, UploadConfig};
use futures::future::join_all;

use crate::flaky_resume_stress::upload_with_retries;
use crate::simulation::{FlakyBackend, FlakyConfig};

fn unique_data(len: usize, seed: usize) -> Vec<u8> {
    (0..len).map(|i| ((i + seed * 7919) % 256) as u8).collect()
}

#[tokio::test]
async fn test_many_sessions_one_server() {
    println!("\n=== 16 concurrent sessions ===\n");

    let backend = MemoryBackend::new();
    let config = UploadConfig::default()
        .with_chunk_size(4 * 1024)
        .with_chunk_threshold(16 * 1024)
        .with_concurrency(3);

    let inputs: Vec<Vec<u8>> = (0..16)
        .map(|i| unique_data(8 * 1024 + i * 5 * 1024, i))
        .collect();

    let start = Instant::now();
    let uploads = inputs.iter().enumerate().map(|(i, data)| {
        smart_upload(
            MemorySource::new(format!("file_{i}.bin"), data.clone()),
            backend.clone(),
            config.clone(),
            Metadata::new(),
        )
    });
    let results = join_all(uploads).await;

    for (data, result) in inputs.iter().zip(results) {
        let stored = result.unwrap();
        let merged = backend.file(&stored.reference).unwrap();
        assert_eq!(FileHasher::hash_bytes(&merged), FileHasher::hash_bytes(data));
    }

    println!("✓ 16 uploads in {:.2?}", start.elapsed());
}

#[tokio::test]
async fn test_concurrent_sessions_on_flaky_server() {
    let inputs: Vec<Vec<u8>> = (0..8).map(|i| unique_data(48 * 1024, i + 100)).collect();
    let config = UploadConfig::default()
        .with_chunk_size(4 * 1024)
        .with_chunk_threshold(0)
        .with_concurrency(2);

    let backend = FlakyBackend::new(FlakyConfig::wifi());
    let runs = inputs
        .iter()
        .map(|data| upload_with_retries(data.clone(), backend.clone(), config.clone(), 200));
    let results = join_all(runs).await;

    let completed = results.iter().filter(|(done, _)| *done).count();
    println!("  {}", backend.stats().summary());
    assert_eq!(completed, inputs.len());
}

#[tokio::test]
async fn test_large_file_many_chunks() {
    let data = unique_data(32 * 1024 * 1024 + 1, 3);
    let backend = MemoryBackend::new();
    let config = UploadConfig::default()
        .with_chunk_size(256 * 1024)
        .with_concurrency(8);

    let start = Instant::now();
    let stored = smart_upload(
        MemorySource::new("large.bin", data.clone()),
        backend.clone(),
        config,
        Metadata::new(),
    )
    .await
    .unwrap();

    assert!(backend.peak_in_flight() <= 8);
    assert_eq!(stored.file_size, Some(data.len() as u64));
    let merged = backend.file(&stored.reference).unwrap();
    assert_eq!(FileHasher::hash_bytes(&merged), FileHasher::hash_bytes(&data));

    println!("✓ 129 chunks uploaded and merged in {:.2?}", start.elapsed());
}
