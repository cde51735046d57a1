//! Local file access through the [`RangeReader`] trait.

use std::io::SeekFrom;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;
use tracing::trace;

use super::range_reader::{check_bounds, RangeReader};
use crate::error::IoError;

/// Range reader over a local file.
///
/// Reads are serialized through a mutex around a single handle; the report
/// pipeline reads one directory at a time so there is no contention.
pub struct FileRangeReader {
    file: Mutex<File>,
    size: u64,
    identifier: String,
}

impl FileRangeReader {
    /// Open `path` and record its size.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let identifier = path.display().to_string();

        let file = File::open(path).await.map_err(|e| IoError::Open {
            path: identifier.clone(),
            message: e.to_string(),
        })?;
        let size = file
            .metadata()
            .await
            .map_err(|e| IoError::Open {
                path: identifier.clone(),
                message: e.to_string(),
            })?
            .len();

        Ok(Self {
            file: Mutex::new(file),
            size,
            identifier,
        })
    }
}

#[async_trait]
impl RangeReader for FileRangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_bounds(offset, len, self.size)?;
        trace!(offset, len, source = %self.identifier, "range read");

        let read_error = |e: std::io::Error| IoError::Read {
            offset,
            message: e.to_string(),
        };

        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(read_error)?;

        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).await.map_err(read_error)?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
