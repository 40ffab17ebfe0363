use serde::{Deserialize, Serialize};

use crate::backend::StoredFile;
use crate::chunk::ChunkDescriptor;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UploadStage {
    Hashing,
    Chunking,
    Checking,
    Uploading,
    Merging,
    Completed,
}

/// A progress snapshot.
///
/// `percentage` is always `round(loaded / total * 100)` over bytes the
/// server has confirmed, for stage transitions and chunk confirmations
/// alike, so within one run it never decreases. Chunk confirmations also
/// carry the chunk index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub stage: UploadStage,
    pub percentage: u8,
    pub loaded: u64,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_chunk: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u32>,
}

impl UploadProgress {
    pub fn stage(stage: UploadStage, loaded: u64, total: u64) -> Self {
        Self {
            stage,
            percentage: percentage(loaded, total),
            loaded,
            total,
            current_chunk: None,
            total_chunks: None,
        }
    }

    pub fn chunk(loaded: u64, total: u64, current_chunk: u32, total_chunks: u32) -> Self {
        Self {
            stage: UploadStage::Uploading,
            percentage: percentage(loaded, total),
            loaded,
            total,
            current_chunk: Some(current_chunk),
            total_chunks: Some(total_chunks),
        }
    }
}

/// `round(loaded / total * 100)`; an empty file counts as fully loaded.
pub fn percentage(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (loaded as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Progress(UploadProgress),
    /// A recoverable problem, such as a failed chunk check.
    Warning(String),
    /// One chunk failed; the run will end with `Failed`.
    ChunkFailed {
        error: String,
        chunk: ChunkDescriptor,
    },

    // Exactly one of these ends every start/resume run.
    Completed(StoredFile),
    Paused,
    Cancelled,
    Failed(String),
}

impl UploadEvent {
    /// Whether this event ends a run.
    pub fn is_run_outcome(&self) -> bool {
        matches!(
            self,
            UploadEvent::Completed(_)
                | UploadEvent::Paused
                | UploadEvent::Cancelled
                | UploadEvent::Failed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounds() {
        assert_eq!(percentage(0, 10), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(10, 10), 100);
        assert_eq!(percentage(0, 0), 100);
    }

    #[test]
    fn test_stage_percentage_follows_confirmed_bytes() {
        assert_eq!(UploadProgress::stage(UploadStage::Hashing, 0, 200).percentage, 0);
        assert_eq!(UploadProgress::stage(UploadStage::Uploading, 50, 200).percentage, 25);
        assert_eq!(UploadProgress::stage(UploadStage::Merging, 200, 200).percentage, 100);
        assert_eq!(
            UploadProgress::stage(UploadStage::Uploading, 50, 200).percentage,
            UploadProgress::chunk(50, 200, 0, 4).percentage
        );
    }

    #[test]
    fn test_progress_wire_format() {
        let value = serde_json::to_value(UploadProgress::chunk(4, 8, 1, 2)).unwrap();
        assert_eq!(value["stage"], "uploading");
        assert_eq!(value["percentage"], 50);
        assert_eq!(value["currentChunk"], 1);

        let value =
            serde_json::to_value(UploadProgress::stage(UploadStage::Merging, 8, 8)).unwrap();
        assert!(value.get("currentChunk").is_none());
    }
}
