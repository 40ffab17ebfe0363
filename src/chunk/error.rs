use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("File of {file_size} bytes needs {count} chunks, more than a u32 index can address")]
    TooManyChunks { file_size: u64, count: u64 },
}

pub type Result<T> = std::result::Result<T, ChunkError>;
