//! Random-access byte sources that an upload reads from.
//!
//! The hasher walks a source window by window and the scheduler slices
//! individual chunks out of it, so a source only needs to answer
//! "give me `len` bytes starting at `start`".

pub mod error;
pub mod file;
pub mod memory;

use std::future::Future;

use bytes::Bytes;

pub use error::{SourceError, SourceResult};
pub use file::FileSource;
pub use memory::MemorySource;

/// A named, fixed-size blob that can be read at arbitrary offsets.
pub trait UploadSource: Send + Sync {
    /// File name sent to the server alongside every request.
    fn name(&self) -> &str;

    /// Total size in bytes. Must not change for the lifetime of an upload.
    fn size(&self) -> u64;

    /// Read exactly `len` bytes starting at `start`.
    ///
    /// Returns `SourceError::OutOfRange` if the range runs past `size()`.
    fn read_range(
        &self,
        start: u64,
        len: usize,
    ) -> impl Future<Output = SourceResult<Bytes>> + Send;
}
