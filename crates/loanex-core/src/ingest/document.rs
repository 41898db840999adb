use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::{TempDir, TempPath};

use crate::error::{Error, Result};

/// A PDF read once from disk at the start of an invocation.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    path: PathBuf,
    bytes: Arc<[u8]>,
}

impl SourceDocument {
    /// Reads `path`. A missing path, or one that is not a regular file, is
    /// reported as [`Error::FileNotFound`].
    pub async fn open(path: &Path) -> Result<Self> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(Error::Io(e)),
        };
        if !metadata.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(path, bytes))
    }

    pub fn from_bytes(path: impl Into<PathBuf>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
    }
}

/// Zero-based, half-open page range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn page_count(&self) -> usize {
        self.end - self.start
    }

    pub const fn contains(&self, page: usize) -> bool {
        page >= self.start && page < self.end
    }
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // One-based and inclusive, the way pages are numbered for people.
        write!(f, "pages {}-{}", self.start + 1, self.end)
    }
}

#[derive(Debug)]
enum ChunkStorage {
    /// The unsplit source, shared with the [`SourceDocument`]
    InMemory(Arc<[u8]>),
    /// Deleted when the chunk is dropped
    Temporary(TempPath),
}

/// One unit of work for the scheduler.
#[derive(Debug)]
pub struct DocumentChunk {
    index: usize,
    pages: Option<PageRange>,
    storage: ChunkStorage,
}

impl DocumentChunk {
    pub(crate) const fn in_memory(index: usize, pages: Option<PageRange>, bytes: Arc<[u8]>) -> Self {
        Self {
            index,
            pages,
            storage: ChunkStorage::InMemory(bytes),
        }
    }

    pub(crate) const fn temporary(index: usize, pages: PageRange, path: TempPath) -> Self {
        Self {
            index,
            pages: Some(pages),
            storage: ChunkStorage::Temporary(path),
        }
    }

    pub const fn index(&self) -> usize {
        self.index
    }

    /// `None` when the source was dispatched without being parsed.
    pub const fn pages(&self) -> Option<PageRange> {
        self.pages
    }

    /// Location of the chunk's temporary file, if it has one.
    pub fn path(&self) -> Option<&Path> {
        match &self.storage {
            ChunkStorage::InMemory(_) => None,
            ChunkStorage::Temporary(path) => Some(path),
        }
    }

    pub const fn is_temporary(&self) -> bool {
        matches!(self.storage, ChunkStorage::Temporary(_))
    }

    pub async fn load(&self) -> io::Result<Arc<[u8]>> {
        match &self.storage {
            ChunkStorage::InMemory(bytes) => Ok(Arc::clone(bytes)),
            ChunkStorage::Temporary(path) => Ok(tokio::fs::read(path).await?.into()),
        }
    }
}

/// All chunks of one invocation, plus the scratch directory holding their
/// files. Dropping the set deletes every temporary file it owns.
#[derive(Debug)]
pub struct ChunkSet {
    chunks: Vec<Arc<DocumentChunk>>,
    scratch: Option<TempDir>,
}

impl ChunkSet {
    /// The whole source as a single in-memory chunk.
    pub fn whole(source: &SourceDocument) -> Self {
        Self::single(source, None)
    }

    pub(crate) fn single(source: &SourceDocument, pages: Option<PageRange>) -> Self {
        Self {
            chunks: vec![Arc::new(DocumentChunk::in_memory(
                0,
                pages,
                source.shared_bytes(),
            ))],
            scratch: None,
        }
    }

    pub(crate) fn split(chunks: Vec<Arc<DocumentChunk>>, scratch: TempDir) -> Self {
        Self {
            chunks,
            scratch: Some(scratch),
        }
    }

    pub fn chunks(&self) -> &[Arc<DocumentChunk>] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }

    /// Page ranges in chunk order; empty when the source was never parsed.
    pub fn page_ranges(&self) -> Vec<PageRange> {
        self.chunks.iter().filter_map(|c| c.pages()).collect()
    }
}

impl Drop for ChunkSet {
    fn drop(&mut self) {
        let temporary = self.chunks.iter().filter(|c| c.is_temporary()).count();
        self.chunks.clear();

        if let Some(scratch) = self.scratch.take() {
            let dir = scratch.path().to_path_buf();
            if let Err(e) = scratch.close() {
                tracing::warn!("Failed to remove scratch directory {}: {}", dir.display(), e);
            } else {
                tracing::debug!(temporary, "Released scratch directory {}", dir.display());
            }
        }
    }
}
