use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lopdf::Document;
use tempfile::TempPath;
use thiserror::Error;

use super::document::{ChunkSet, DocumentChunk, PageRange, SourceDocument};
use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Invalid PDF document: {0}")]
    InvalidPdf(String),

    #[error("PDF document has no pages")]
    NoPages,

    #[error("Chunk size must be at least one page")]
    InvalidChunkSize,

    #[error("Failed to write chunk {index}: {reason}")]
    WriteChunk { index: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SplitError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPdf(_) | Self::NoPages => ErrorKind::DocumentFormat,
            Self::InvalidChunkSize => ErrorKind::Configuration,
            Self::WriteChunk { .. } | Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Contiguous page ranges of at most `chunk_pages` pages covering
/// `0..total_pages` in order. Only the last range may be shorter.
pub fn plan(total_pages: usize, chunk_pages: usize) -> Vec<PageRange> {
    if chunk_pages == 0 {
        return Vec::new();
    }
    (0..total_pages)
        .step_by(chunk_pages)
        .map(|start| PageRange::new(start, (start + chunk_pages).min(total_pages)))
        .collect()
}

/// Splits a PDF into chunk files of a fixed page count.
///
/// Chunk files live in a fresh scratch directory under the temp root and are
/// owned by the returned [`ChunkSet`]. On failure every file already written
/// is removed before the error is returned.
#[derive(Debug, Clone)]
pub struct PageSplitter {
    chunk_pages: usize,
    temp_root: PathBuf,
}

impl PageSplitter {
    pub fn new(chunk_pages: usize) -> Self {
        Self {
            chunk_pages,
            temp_root: std::env::temp_dir(),
        }
    }

    #[must_use]
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    pub const fn chunk_pages(&self) -> usize {
        self.chunk_pages
    }

    pub fn page_count(bytes: &[u8]) -> Result<usize, SplitError> {
        let document = load(bytes)?;
        Ok(document.get_pages().len())
    }

    /// Page ranges `split` would produce for `bytes`, without writing anything.
    pub fn plan_for(&self, bytes: &[u8]) -> Result<Vec<PageRange>, SplitError> {
        if self.chunk_pages == 0 {
            return Err(SplitError::InvalidChunkSize);
        }
        let total = Self::page_count(bytes)?;
        if total == 0 {
            return Err(SplitError::NoPages);
        }
        Ok(plan(total, self.chunk_pages))
    }

    /// CPU-bound; callers on the async runtime should use `spawn_blocking`.
    pub fn split(&self, source: &SourceDocument) -> Result<ChunkSet, SplitError> {
        self.split_with(source, write_chunk)
    }

    fn split_with<W>(&self, source: &SourceDocument, mut write: W) -> Result<ChunkSet, SplitError>
    where
        W: FnMut(&Document, usize, PageRange, usize, &Path) -> Result<TempPath, SplitError>,
    {
        if self.chunk_pages == 0 {
            return Err(SplitError::InvalidChunkSize);
        }

        let document = load(source.bytes())?;
        let total = document.get_pages().len();
        if total == 0 {
            return Err(SplitError::NoPages);
        }

        if total <= self.chunk_pages {
            tracing::debug!(pages = total, "Document fits in a single chunk");
            return Ok(ChunkSet::single(source, Some(PageRange::new(0, total))));
        }

        let scratch = tempfile::Builder::new()
            .prefix("loanex-")
            .tempdir_in(&self.temp_root)?;

        let ranges = plan(total, self.chunk_pages);
        tracing::info!(
            pages = total,
            chunks = ranges.len(),
            "Splitting {} into {} chunks",
            source.path().display(),
            ranges.len()
        );

        let mut chunks = Vec::with_capacity(ranges.len());
        for (index, range) in ranges.into_iter().enumerate() {
            // Chunks already written are removed when `chunks` and `scratch` drop.
            let path = write(&document, total, range, index, scratch.path())?;
            tracing::debug!(index, %range, "Wrote chunk {}", path.display());
            chunks.push(Arc::new(DocumentChunk::temporary(index, range, path)));
        }

        Ok(ChunkSet::split(chunks, scratch))
    }
}

fn load(bytes: &[u8]) -> Result<Document, SplitError> {
    Document::load_mem(bytes).map_err(|e| SplitError::InvalidPdf(e.to_string()))
}

fn write_chunk(
    document: &Document,
    total: usize,
    range: PageRange,
    index: usize,
    dir: &Path,
) -> Result<TempPath, SplitError> {
    // lopdf numbers pages from 1.
    let outside: Vec<u32> = (0..total)
        .filter(|page| !range.contains(*page))
        .filter_map(|page| u32::try_from(page + 1).ok())
        .collect();

    let mut part = document.clone();
    part.delete_pages(&outside);
    part.prune_objects();

    let mut file = tempfile::Builder::new()
        .prefix(&format!("chunk-{index:04}-"))
        .suffix(".pdf")
        .tempfile_in(dir)?;
    part.save_to(file.as_file_mut())
        .map_err(|e| SplitError::WriteChunk {
            index,
            reason: e.to_string(),
        })?;
    file.as_file_mut().flush()?;

    Ok(file.into_temp_path())
}
