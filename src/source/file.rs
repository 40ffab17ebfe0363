use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::error::{SourceError, SourceResult};
use super::UploadSource;

/// A file on the local filesystem.
///
/// Every `read_range` opens its own handle, so chunk reads from concurrent
/// upload tasks never share a cursor.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
    size: u64,
}

impl FileSource {
    /// Open `path` and capture its name and current size.
    pub async fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(Self {
            path,
            name,
            size: metadata.len(),
        })
    }

    /// Override the file name reported to the server.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UploadSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read_range(&self, start: u64, len: usize) -> SourceResult<Bytes> {
        let in_range = start
            .checked_add(len as u64)
            .is_some_and(|end| end <= self.size);
        if !in_range {
            return Err(SourceError::OutOfRange {
                start,
                len,
                size: self.size,
            });
        }

        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(start)).await?;

        let mut buf = BytesMut::zeroed(len);
        let mut filled = 0;
        while filled < len {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(SourceError::ShortRead {
                    start,
                    expected: len,
                    actual: filled,
                });
            }
            filled += n;
        }

        Ok(buf.freeze())
    }
}
