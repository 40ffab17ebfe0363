//! Resume-until-done stress tests
//!
//! Drives sessions against an unreliable server, calling `resume` after
//! every failure, and checks that the merged file is always intact.

use std::collections::BTreeSet;

use chunkstream_upload::chunk::FileHasher;
use chunkstream_upload::{MemorySource, RunOutcome, UploadConfig, UploadSession, UploadState};

use crate::simulation::{FlakyBackend, FlakyConfig};

/// Upload `data`, resuming after every failure. Returns the attempts used.
pub async fn upload_with_retries(
    data: Vec<u8>,
    backend: FlakyBackend,
    config: UploadConfig,
    max_attempts: usize,
) -> (bool, usize) {
    let (session, _events) =
        UploadSession::new(MemorySource::new("stress.bin", data), backend, config).unwrap();

    for attempt in 1..=max_attempts {
        let result = if attempt == 1 {
            session.start().await
        } else {
            session.resume().await
        };

        match result {
            Ok(RunOutcome::Completed(_)) => return (true, attempt),
            Ok(other) => panic!("unexpected outcome {other:?}"),
            Err(_) => {
                assert!(matches!(session.state(), UploadState::Failed { .. }));
            }
        }
    }

    (false, max_attempts)
}

#[tokio::test]
async fn test_degraded_server_eventually_completes() {
    println!("\n=== Resume under 20% chunk failures ===\n");

    let data: Vec<u8> = (0..256 * 1024).map(|i| (i % 253) as u8).collect();
    let backend = FlakyBackend::new(FlakyConfig::degraded());
    let config = UploadConfig::default()
        .with_chunk_size(8 * 1024)
        .with_chunk_threshold(0)
        .with_concurrency(4);

    let (done, attempts) = upload_with_retries(data.clone(), backend.clone(), config, 500).await;
    assert!(done, "did not complete: {}", backend.stats().summary());

    let file_id = FileHasher::hash_bytes(&data);
    let reference = format!("memory://{}/stress.bin", file_id);
    let merged = backend.store().file(&reference).unwrap();
    assert_eq!(FileHasher::hash_bytes(&merged), file_id);

    println!("✓ Completed after {} attempts", attempts);
    println!("  {}", backend.stats().summary());
}

#[tokio::test]
async fn test_failed_attempts_never_resend_confirmed_chunks() {
    let data: Vec<u8> = (0..64 * 1024).map(|i| (i % 241) as u8).collect();
    let backend = FlakyBackend::new(FlakyConfig::with_chunk_failures(0.3));
    let config = UploadConfig::default()
        .with_chunk_size(1024)
        .with_chunk_threshold(0)
        .with_concurrency(3);

    let (session, _events) =
        UploadSession::new(MemorySource::new("stress.bin", data), backend.clone(), config).unwrap();

    let mut confirmed_before = BTreeSet::new();
    let mut result = session.start().await;
    for _ in 0..500 {
        if result.is_ok() {
            break;
        }
        let confirmed: BTreeSet<u32> = session
            .chunk_statuses()
            .into_iter()
            .filter(|(_, status)| status.is_confirmed())
            .map(|(index, _)| index)
            .collect();
        assert!(confirmed.is_superset(&confirmed_before));
        confirmed_before = confirmed;

        backend.store().clear_calls();
        result = session.resume().await;
        let resent: BTreeSet<u32> = backend.store().uploaded_indices().into_iter().collect();
        assert!(resent.is_disjoint(&confirmed_before));
    }

    assert!(matches!(result, Ok(RunOutcome::Completed(_))));
    assert_eq!(session.bytes_confirmed(), 64 * 1024);
}
