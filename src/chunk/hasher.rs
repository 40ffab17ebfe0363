use blake3::Hasher;

use super::types::FileId;
use crate::source::{SourceResult, UploadSource};

/// Default hashing window: 1 MiB.
pub const DEFAULT_HASH_WINDOW: usize = 1024 * 1024;

/// Streams a source through BLAKE3 one window at a time.
pub struct FileHasher {
    window: usize,
}

impl Default for FileHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_WINDOW)
    }
}

impl FileHasher {
    /// A zero window falls back to [`DEFAULT_HASH_WINDOW`].
    pub fn new(window: usize) -> Self {
        let window = if window == 0 { DEFAULT_HASH_WINDOW } else { window };
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Compute the file id for `source`.
    ///
    /// At most one window is held in memory at a time. Any read error aborts
    /// the hash.
    pub async fn hash<S: UploadSource>(&self, source: &S) -> SourceResult<FileId> {
        let size = source.size();
        let mut hasher = Hasher::new();
        let mut offset = 0u64;

        while offset < size {
            let len = std::cmp::min(self.window as u64, size - offset) as usize;
            let window = source.read_range(offset, len).await?;
            hasher.update(&window);
            offset += len as u64;
        }

        Ok(FileId::new(hasher.finalize().to_hex().to_string()))
    }

    /// File id for an in-memory buffer; matches [`FileHasher::hash`].
    pub fn hash_bytes(data: &[u8]) -> FileId {
        FileId::new(blake3::hash(data).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, SourceError};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_data(size: usize) -> Vec<u8> {
        (0..size).map(|i| (i % 251) as u8).collect()
    }

    /// Records the largest read so tests can check the window bound.
    struct CountingSource {
        inner: MemorySource,
        max_read: AtomicUsize,
        reads: AtomicUsize,
        fail_at: Option<u64>,
    }

    impl CountingSource {
        fn new(data: Vec<u8>, fail_at: Option<u64>) -> Self {
            Self {
                inner: MemorySource::new("counted.bin", data),
                max_read: AtomicUsize::new(0),
                reads: AtomicUsize::new(0),
                fail_at,
            }
        }
    }

    impl UploadSource for CountingSource {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn size(&self) -> u64 {
            self.inner.size()
        }

        async fn read_range(&self, start: u64, len: usize) -> SourceResult<Bytes> {
            if self.fail_at == Some(start) {
                return Err(SourceError::Io(std::io::Error::other("disk went away")));
            }
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.max_read.fetch_max(len, Ordering::SeqCst);
            self.inner.read_range(start, len).await
        }
    }

    #[tokio::test]
    async fn test_hash_is_deterministic() {
        let data = test_data(10_000);
        let hasher = FileHasher::new(1024);

        let first = hasher.hash(&MemorySource::new("a", data.clone())).await.unwrap();
        let second = hasher.hash(&MemorySource::new("b", data)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 64);
    }

    #[tokio::test]
    async fn test_hash_independent_of_window() {
        let data = test_data(10_000);
        let source = MemorySource::new("a", data.clone());

        let small = FileHasher::new(7).hash(&source).await.unwrap();
        let large = FileHasher::new(1 << 20).hash(&source).await.unwrap();

        assert_eq!(small, large);
        assert_eq!(small, FileHasher::hash_bytes(&data));
    }

    #[tokio::test]
    async fn test_one_byte_difference_changes_id() {
        let data = test_data(4096);
        let mut altered = data.clone();
        altered[2048] ^= 0x01;

        let hasher = FileHasher::new(512);
        let original = hasher.hash(&MemorySource::new("a", data)).await.unwrap();
        let changed = hasher.hash(&MemorySource::new("a", altered)).await.unwrap();

        assert_ne!(original, changed);
    }

    #[tokio::test]
    async fn test_reads_are_bounded_by_window() {
        let source = CountingSource::new(test_data(10_000), None);
        FileHasher::new(1024).hash(&source).await.unwrap();

        assert_eq!(source.max_read.load(Ordering::SeqCst), 1024);
        assert_eq!(source.reads.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_read_error_aborts_hash() {
        let source = CountingSource::new(test_data(10_000), Some(2048));
        let result = FileHasher::new(1024).hash(&source).await;

        assert!(matches!(result, Err(SourceError::Io(_))));
    }

    #[tokio::test]
    async fn test_empty_source() {
        let id = FileHasher::default()
            .hash(&MemorySource::new("empty", Vec::new()))
            .await
            .unwrap();
        assert_eq!(id, FileHasher::hash_bytes(&[]));
    }
}
