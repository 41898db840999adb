#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod ingest;
pub mod network;
pub mod record;
pub mod settings;
pub mod storage;

pub use error::{Error, ErrorKind, Result};
pub use ingest::{
    merge, process_document, process_with_settings, ChunkClassifier, ChunkExtraction,
    ChunkExtractor, ChunkScheduler, ChunkSet, DocumentChunk, DocumentPipeline, DocumentType,
    ExtractionError, PageRange, PageSplitter, PipelineState, ProcessOutcome, SourceDocument,
    SplitError,
};
pub use network::{Classification, ExtractionClient, ExtractionService, ServiceError};
pub use record::{ExtractedFields, MergedRecord};
pub use settings::{ConfigError, PipelineConfig, ServiceConfig, Settings, StoreConfig};
pub use storage::{RecordStore, RestStore, SqliteStore, StoreError};
