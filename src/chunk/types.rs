use std::fmt;

use serde::{Deserialize, Serialize};

/// Content-derived identifier for a whole file.
///
/// The server uses it to correlate the chunks of one upload, so identical
/// bytes must always produce the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One addressable slice `[start, end)` of the source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    pub index: u32,
    pub start: u64,
    pub end: u64,
    pub size: u64,
    /// `"{file_id}-{index}"`, the per-chunk key the server stores under.
    pub key: String,
}

impl ChunkDescriptor {
    pub fn len(&self) -> usize {
        self.size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChunkStatus {
    Pending,
    InFlight,
    Confirmed,
    Failed,
}

impl ChunkStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ChunkStatus::Confirmed)
    }
}
