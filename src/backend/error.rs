use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request rejected by server: {0}")]
    Rejected(String),

    #[error("Missing chunks for {file_hash}: {missing:?}")]
    MissingChunks { file_hash: String, missing: Vec<u32> },

    #[error("Merged size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
}

pub type BackendResult<T> = Result<T, BackendError>;
