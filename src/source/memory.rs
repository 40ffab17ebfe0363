use bytes::Bytes;

use super::error::{SourceError, SourceResult};
use super::UploadSource;

/// An in-memory upload source.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    data: Bytes,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

impl UploadSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_range(&self, start: u64, len: usize) -> SourceResult<Bytes> {
        let size = self.size();
        let end = start
            .checked_add(len as u64)
            .filter(|end| *end <= size)
            .ok_or(SourceError::OutOfRange { start, len, size })?;

        Ok(self.data.slice(start as usize..end as usize))
    }
}
