use std::collections::{BTreeMap, BTreeSet};

use crate::chunk::{ChunkDescriptor, ChunkStatus};

/// Per-chunk status bookkeeping for one upload.
///
/// Only the scheduler (and the session on its behalf) writes to it.
/// Confirmed bytes are counted once per chunk, so `bytes_confirmed()`
/// never exceeds the sum of the planned chunk sizes.
#[derive(Debug, Clone, Default)]
pub struct ChunkTable {
    chunks: Vec<ChunkDescriptor>,
    statuses: BTreeMap<u32, ChunkStatus>,
    bytes_confirmed: u64,
}

impl ChunkTable {
    pub fn new(chunks: Vec<ChunkDescriptor>) -> Self {
        let statuses = chunks
            .iter()
            .map(|chunk| (chunk.index, ChunkStatus::Pending))
            .collect();

        Self {
            chunks,
            statuses,
            bytes_confirmed: 0,
        }
    }

    pub fn chunks(&self) -> &[ChunkDescriptor] {
        &self.chunks
    }

    pub fn total_chunks(&self) -> u32 {
        self.chunks.len() as u32
    }

    pub fn bytes_confirmed(&self) -> u64 {
        self.bytes_confirmed
    }

    pub fn status(&self, index: u32) -> Option<ChunkStatus> {
        self.statuses.get(&index).copied()
    }

    pub fn statuses(&self) -> BTreeMap<u32, ChunkStatus> {
        self.statuses.clone()
    }

    /// Mark chunks the server already holds as confirmed.
    ///
    /// Unknown indices are ignored. Returns how many chunks changed.
    pub fn apply_confirmed(&mut self, indices: &BTreeSet<u32>) -> usize {
        indices
            .iter()
            .filter(|index| self.mark_confirmed(**index).is_some())
            .count()
    }

    /// Descriptors still needing upload, ascending by index.
    pub fn pending(&self) -> Vec<ChunkDescriptor> {
        self.chunks
            .iter()
            .filter(|chunk| !self.status(chunk.index).is_some_and(|s| s.is_confirmed()))
            .cloned()
            .collect()
    }

    pub fn mark_in_flight(&mut self, index: u32) {
        self.set_status(index, ChunkStatus::InFlight);
    }

    pub fn mark_failed(&mut self, index: u32) {
        self.set_status(index, ChunkStatus::Failed);
    }

    /// Returns the new confirmed byte total, or `None` if the chunk was
    /// unknown or already confirmed.
    pub fn mark_confirmed(&mut self, index: u32) -> Option<u64> {
        let size = self.chunks.get(index as usize)?.size;
        let status = self.statuses.get_mut(&index)?;
        if status.is_confirmed() {
            return None;
        }
        *status = ChunkStatus::Confirmed;
        self.bytes_confirmed += size;
        Some(self.bytes_confirmed)
    }

    pub fn count(&self, status: ChunkStatus) -> usize {
        self.statuses.values().filter(|s| **s == status).count()
    }

    pub fn in_flight(&self) -> usize {
        self.count(ChunkStatus::InFlight)
    }

    pub fn confirmed_indices(&self) -> BTreeSet<u32> {
        self.statuses
            .iter()
            .filter(|(_, status)| status.is_confirmed())
            .map(|(index, _)| *index)
            .collect()
    }

    /// True when every planned chunk is confirmed (vacuously for no chunks).
    pub fn all_confirmed(&self) -> bool {
        self.statuses.values().all(|status| status.is_confirmed())
    }

    /// Drop all bookkeeping, as on cancel.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.statuses.clear();
        self.bytes_confirmed = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn set_status(&mut self, index: u32, status: ChunkStatus) {
        if let Some(current) = self.statuses.get_mut(&index) {
            if !current.is_confirmed() {
                *current = status;
            }
        }
    }
}
