//! Request and response bodies exchanged with the upload server.
//!
//! Field names serialize in camelCase to match the REST payloads
//! (`fileHash`, `chunkIndex`, `uploadedChunks`, ...). Raw bytes are skipped
//! by serde; a transport sends them as the multipart file part.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Caller-supplied fields forwarded with merge and direct-upload requests.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckChunksRequest {
    pub file_hash: String,
    pub file_name: String,
    pub total_chunks: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckChunksResponse {
    #[serde(default)]
    pub uploaded_chunks: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUploadRequest {
    #[serde(skip)]
    pub chunk: Bytes,
    pub chunk_index: u32,
    pub chunk_hash: String,
    pub file_hash: String,
    pub file_name: String,
    pub total_chunks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub file_hash: String,
    pub file_name: String,
    pub total_chunks: u32,
    pub file_size: u64,
    #[serde(flatten)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleUploadRequest {
    #[serde(skip)]
    pub file: Bytes,
    pub file_name: String,
    #[serde(flatten)]
    pub metadata: Metadata,
}

/// Server's answer to a merge or direct upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// Where the server put the file (URL, path or object key).
    pub reference: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(flatten)]
    pub extra: Metadata,
}
