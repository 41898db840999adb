//! Turning one PDF into one persisted record: split, classify and extract
//! each chunk, merge, store.

mod classifier;
mod document;
mod extractor;
mod merger;
mod pipeline;
mod scheduler;
mod splitter;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::ChunkClassifier;
pub use document::{ChunkSet, DocumentChunk, PageRange, SourceDocument};
pub use extractor::{map_fields, ChunkExtractor, DocumentType, ExtractionError};
pub use merger::merge;
pub use pipeline::{
    process_document, process_with_settings, DocumentPipeline, PipelineState, ProcessOutcome,
};
pub use scheduler::{ChunkExtraction, ChunkScheduler};
pub use splitter::{plan, PageSplitter, SplitError};
