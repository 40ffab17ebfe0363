use parking_lot::Mutex;

use crate::backend::{Metadata, MergeRequest, StoredFile, UploadBackend};
use crate::chunk::ChunkStatus;
use crate::metrics::record_merge;
use crate::scheduler::{ChunkTable, UploadContext};
use crate::session::error::{UploadError, UploadResult};

pub struct Finalizer;

impl Finalizer {
    /// Ask the server to assemble the file from its stored chunks.
    ///
    /// Refuses to send the merge unless every planned chunk is confirmed.
    /// A failed merge leaves the chunk table untouched, so calling this
    /// again retries the merge without uploading anything.
    pub async fn finalize<B: UploadBackend>(
        backend: &B,
        context: &UploadContext,
        table: &Mutex<ChunkTable>,
        metadata: &Metadata,
    ) -> UploadResult<StoredFile> {
        {
            let table = table.lock();
            let confirmed = table.count(ChunkStatus::Confirmed);
            if table.total_chunks() != context.total_chunks || !table.all_confirmed() {
                return Err(UploadError::Incomplete {
                    confirmed,
                    total: context.total_chunks,
                });
            }
        }

        let request = MergeRequest {
            file_hash: context.file_id.to_string(),
            file_name: context.file_name.clone(),
            total_chunks: context.total_chunks,
            file_size: context.file_size,
            metadata: metadata.clone(),
        };

        tracing::info!(
            "Merging {} chunks of {} ({} bytes)",
            context.total_chunks,
            context.file_name,
            context.file_size
        );

        match backend.merge_chunks(request).await {
            Ok(file) => {
                record_merge(true);
                tracing::info!("Merged {} into {}", context.file_name, file.reference);
                Ok(file)
            }
            Err(e) => {
                record_merge(false);
                tracing::warn!("Merge of {} failed: {}", context.file_name, e);
                Err(UploadError::Merge(e))
            }
        }
    }
}
