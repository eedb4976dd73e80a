//! Local artifact file and chunk partitioning

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{AppCenterError, Result};

/// A file read fully into memory
///
/// Chunks and upload bodies are reference-counted views into the same
/// buffer, so neither splitting nor request retries copy file data.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    content: Bytes,
}

impl LocalFile {
    /// Read `path` into memory
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AppCenterError::InvalidArtifact(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let content = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(path, content))
    }

    pub fn from_bytes(path: impl Into<PathBuf>, content: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last path component
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// A shared handle to the whole file
    pub fn bytes(&self) -> Bytes {
        self.content.clone()
    }

    /// Split into consecutive chunks of `chunk_size` bytes; the last one may be shorter
    pub fn chunks(&self, chunk_size: u64) -> Result<Vec<FileChunk>> {
        let ranges = chunk_ranges(self.content.len(), chunk_size)?;
        Ok(ranges
            .into_iter()
            .map(|range| FileChunk {
                offset: range.start,
                data: self.content.slice(range),
            })
            .collect())
    }
}

/// A byte range of a [`LocalFile`]
#[derive(Debug, Clone)]
pub struct FileChunk {
    data: Bytes,
    offset: usize,
}

impl FileChunk {
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// The chunk as a request body, sharing the file buffer
    pub fn data(&self) -> Bytes {
        self.data.clone()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset of the first byte in the file
    pub fn offset(&self) -> usize {
        self.offset
    }
}

fn chunk_ranges(len: usize, chunk_size: u64) -> Result<Vec<std::ops::Range<usize>>> {
    let size = usize::try_from(chunk_size)
        .ok()
        .filter(|s| *s > 0)
        .ok_or(AppCenterError::InvalidChunkSize(chunk_size))?;

    Ok((0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect())
}
