use std::future::Future;

use super::error::BackendResult;
use super::types::{
    CheckChunksRequest, CheckChunksResponse, ChunkUploadRequest, MergeRequest,
    SimpleUploadRequest, StoredFile,
};

/// The server-side collaborator an upload talks to.
///
/// Implementations own the transport (HTTP client, auth headers, response
/// envelopes). The engine only issues these four calls and interprets their
/// results; it never retries on its own.
pub trait UploadBackend: Send + Sync {
    /// Ask which chunk indices the server already holds for a file.
    fn check_chunks(
        &self,
        request: CheckChunksRequest,
    ) -> impl Future<Output = BackendResult<CheckChunksResponse>> + Send;

    /// Store one chunk. `Ok(())` means the server confirmed it.
    fn upload_chunk(
        &self,
        request: ChunkUploadRequest,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Reassemble all chunks of a file. Must be idempotent per `file_hash`.
    fn merge_chunks(
        &self,
        request: MergeRequest,
    ) -> impl Future<Output = BackendResult<StoredFile>> + Send;

    /// Upload a small file in a single request.
    fn simple_upload(
        &self,
        request: SimpleUploadRequest,
    ) -> impl Future<Output = BackendResult<StoredFile>> + Send;
}
