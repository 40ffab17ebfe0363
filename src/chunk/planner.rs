//! Deterministic partitioning of a file into chunk descriptors.
//!
//! A zero-byte file plans to zero descriptors: there is nothing to upload,
//! the scheduler finishes immediately and the merge request carries
//! `total_chunks = 0`.

use super::error::{ChunkError, Result};
use super::types::{ChunkDescriptor, FileId};

/// Number of chunks needed to cover `file_size` bytes.
pub fn chunk_count(file_size: u64, chunk_size: u64) -> Result<u32> {
    if chunk_size == 0 {
        return Err(ChunkError::InvalidChunkSize(
            "chunk size must be greater than zero".into(),
        ));
    }

    let count = file_size.div_ceil(chunk_size);
    u32::try_from(count).map_err(|_| ChunkError::TooManyChunks { file_size, count })
}

pub fn chunk_key(file_id: &FileId, index: u32) -> String {
    format!("{file_id}-{index}")
}

/// Partition `file_size` bytes into contiguous chunks of `chunk_size`.
///
/// Every chunk but the last is exactly `chunk_size` bytes; the last holds
/// the remainder.
pub fn plan(file_id: &FileId, file_size: u64, chunk_size: u64) -> Result<Vec<ChunkDescriptor>> {
    let count = chunk_count(file_size, chunk_size)?;

    let chunks = (0..count)
        .map(|index| {
            let start = index as u64 * chunk_size;
            let end = std::cmp::min(start + chunk_size, file_size);
            ChunkDescriptor {
                index,
                start,
                end,
                size: end - start,
                key: chunk_key(file_id, index),
            }
        })
        .collect();

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn file_id() -> FileId {
        FileId::new("abc123")
    }

    fn assert_covers(chunks: &[ChunkDescriptor], file_size: u64, chunk_size: u64) {
        assert_eq!(chunks.len() as u64, file_size.div_ceil(chunk_size));

        let mut expected_start = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index as usize, i);
            assert_eq!(chunk.start, expected_start);
            assert_eq!(chunk.size, chunk.end - chunk.start);
            assert!(chunk.size > 0);
            assert!(chunk.size <= chunk_size);
            expected_start = chunk.end;
        }
        assert_eq!(expected_start, file_size);
    }

    #[test]
    fn test_plan_covers_file_exactly_once() {
        let cases = [
            (1, 1),
            (1, 7),
            (7, 7),
            (8, 7),
            (100, 3),
            (4096, 1024),
            (4097, 1024),
            (9 * MIB, 2 * MIB),
            (10 * MIB, 2 * MIB),
            (u32::MAX as u64 + 5, MIB),
        ];

        for (file_size, chunk_size) in cases {
            let chunks = plan(&file_id(), file_size, chunk_size).unwrap();
            assert_covers(&chunks, file_size, chunk_size);
        }
    }

    #[test]
    fn test_last_chunk_holds_remainder() {
        let chunks = plan(&file_id(), 9 * MIB, 2 * MIB).unwrap();

        assert_eq!(chunks.len(), 5);
        for chunk in &chunks[..4] {
            assert_eq!(chunk.size, 2 * MIB);
        }
        assert_eq!(chunks[4].size, MIB);
        assert_eq!(chunks[4].start, 8 * MIB);
        assert_eq!(chunks[4].end, 9 * MIB);
    }

    #[test]
    fn test_zero_size_file_plans_no_chunks() {
        let chunks = plan(&file_id(), 0, 2 * MIB).unwrap();
        assert!(chunks.is_empty());
        assert_eq!(chunk_count(0, 2 * MIB).unwrap(), 0);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let result = plan(&file_id(), 100, 0);
        assert!(matches!(result, Err(ChunkError::InvalidChunkSize(_))));
    }

    #[test]
    fn test_too_many_chunks_rejected() {
        let result = chunk_count(u64::MAX, 1);
        assert!(matches!(result, Err(ChunkError::TooManyChunks { .. })));
    }

    #[test]
    fn test_chunk_keys_derive_from_file_id() {
        let chunks = plan(&file_id(), 10, 4).unwrap();
        let keys: Vec<&str> = chunks.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["abc123-0", "abc123-1", "abc123-2"]);
    }
}
