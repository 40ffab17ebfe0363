use std::collections::BTreeSet;

use crate::backend::{BackendError, CheckChunksRequest, UploadBackend};
use crate::chunk::FileId;

/// What the server reported for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Negotiation {
    /// Indices already stored server-side, restricted to `0..total_chunks`.
    pub confirmed: BTreeSet<u32>,
    /// Set when the check failed and the negotiator assumed nothing is stored.
    pub warning: Option<String>,
}

impl Negotiation {
    pub fn is_fresh(&self) -> bool {
        self.confirmed.is_empty()
    }
}

pub struct ResumeNegotiator;

impl ResumeNegotiator {
    /// Ask the server which chunks it has.
    ///
    /// A failed check is not fatal: the upload proceeds as if nothing had
    /// been stored and the failure comes back as a warning.
    pub async fn negotiate<B: UploadBackend>(
        backend: &B,
        file_id: &FileId,
        file_name: &str,
        total_chunks: u32,
    ) -> Negotiation {
        let request = CheckChunksRequest {
            file_hash: file_id.to_string(),
            file_name: file_name.to_string(),
            total_chunks,
        };

        match backend.check_chunks(request).await {
            Ok(response) => {
                let reported = response.uploaded_chunks.len();
                let confirmed: BTreeSet<u32> = response
                    .uploaded_chunks
                    .into_iter()
                    .filter(|index| *index < total_chunks)
                    .collect();

                if confirmed.len() < reported {
                    tracing::debug!(
                        "Ignoring {} out-of-range or duplicate chunk indices for {}",
                        reported - confirmed.len(),
                        file_id
                    );
                }
                tracing::info!(
                    "Server holds {}/{} chunks of {}",
                    confirmed.len(),
                    total_chunks,
                    file_id
                );

                Negotiation {
                    confirmed,
                    warning: None,
                }
            }
            Err(e) => Self::fail_open(file_id, e),
        }
    }

    fn fail_open(file_id: &FileId, error: BackendError) -> Negotiation {
        let warning = format!("Chunk check failed, uploading all chunks: {error}");
        tracing::warn!("{} ({})", warning, file_id);
        Negotiation {
            confirmed: BTreeSet::new(),
            warning: Some(warning),
        }
    }
}
