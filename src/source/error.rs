use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Read of {len} bytes at offset {start} is past end of source ({size} bytes)")]
    OutOfRange { start: u64, len: usize, size: u64 },

    #[error("Short read at offset {start}: expected {expected} bytes, got {actual}")]
    ShortRead {
        start: u64,
        expected: usize,
        actual: usize,
    },
}

pub type SourceResult<T> = Result<T, SourceError>;
