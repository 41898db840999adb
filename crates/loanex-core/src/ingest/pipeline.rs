use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::classifier::ChunkClassifier;
use super::document::{ChunkSet, SourceDocument};
use super::extractor::ChunkExtractor;
use super::merger::merge;
use super::scheduler::ChunkScheduler;
use super::splitter::PageSplitter;
use crate::error::{Error, ErrorKind, Result};
use crate::network::{ExtractionClient, ExtractionService};
use crate::record::MergedRecord;
use crate::settings::{ConfigError, PipelineConfig, Settings};
use crate::storage::{open_store, RecordStore, StoreError};

/// Stages of one invocation. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Validating,
    Splitting,
    Extracting,
    Merging,
    Persisting,
    Done,
    Failed(ErrorKind),
}

impl PipelineState {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validating => f.write_str("validating"),
            Self::Splitting => f.write_str("splitting"),
            Self::Extracting => f.write_str("extracting"),
            Self::Merging => f.write_str("merging"),
            Self::Persisting => f.write_str("persisting"),
            Self::Done => f.write_str("done"),
            Self::Failed(kind) => write!(f, "failed ({kind})"),
        }
    }
}

/// What the caller gets back from every invocation, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<MergedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_chunks: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
}

impl ProcessOutcome {
    pub fn completed(record: MergedRecord, processed_chunks: usize) -> Self {
        Self {
            success: true,
            data: Some(record),
            processed_chunks: Some(processed_chunks),
            error: None,
            error_type: None,
        }
    }

    pub fn failed(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            processed_chunks: None,
            error: Some(error.to_string()),
            error_type: Some(error.kind()),
        }
    }
}

/// Runs one document from file to persisted record.
pub struct DocumentPipeline {
    service: Arc<dyn ExtractionService>,
    store: Arc<dyn RecordStore>,
    config: PipelineConfig,
}

impl DocumentPipeline {
    pub fn new(
        service: Arc<dyn ExtractionService>,
        store: Arc<dyn RecordStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            service,
            store,
            config,
        }
    }

    /// Wires the HTTP service client and the configured record store.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let timeout = Duration::from_secs(u64::from(settings.service.request_timeout_seconds));
        let store = open_store(&settings.store, timeout)
            .await
            .map_err(Error::StoreUnavailable)?;
        let client = ExtractionClient::new(settings.service)?;

        Ok(Self::new(Arc::new(client), Arc::from(store), settings.pipeline))
    }

    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Never fails; errors are reported in the returned outcome.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub async fn process(&self, path: &Path) -> ProcessOutcome {
        let mut state = PipelineState::Validating;

        match self.run(path, &mut state).await {
            Ok((record, processed_chunks)) => {
                tracing::info!(
                    chunks = processed_chunks,
                    income = record.fields.income,
                    "Document processed"
                );
                ProcessOutcome::completed(record, processed_chunks)
            }
            Err(e) => {
                let kind = e.kind();
                tracing::error!(stage = %state, error_type = %kind, "Error processing document: {}", e);
                advance(&mut state, PipelineState::Failed(kind));
                ProcessOutcome::failed(&e)
            }
        }
    }

    async fn run(&self, path: &Path, state: &mut PipelineState) -> Result<(MergedRecord, usize)> {
        self.config.validate()?;
        let source = SourceDocument::open(path).await?;

        let chunks = if source.byte_size() > self.config.split_threshold_bytes {
            advance(state, PipelineState::Splitting);
            self.split(source.clone()).await?
        } else {
            tracing::debug!(bytes = source.byte_size(), "Sending document unsplit");
            ChunkSet::whole(&source)
        };

        advance(state, PipelineState::Extracting);
        let scheduler = ChunkScheduler::new(
            ChunkClassifier::new(
                Arc::clone(&self.service),
                self.config.default_document_type.clone(),
            ),
            ChunkExtractor::new(Arc::clone(&self.service)),
            self.config.max_concurrent_chunks,
        );
        let extractions = scheduler.run(chunks.chunks()).await?;
        let processed_chunks = chunks.len();
        drop(chunks);

        advance(state, PipelineState::Merging);
        let fields = merge(extractions.iter().map(|e| &e.fields));
        let mut record = MergedRecord::new(fields, processed_chunks)
            .with_document_types(extractions.iter().map(|e| e.document_type.as_str()));
        if let Some(name) = source.file_name() {
            record = record.with_source_file(name);
        }

        advance(state, PipelineState::Persisting);
        let value = serde_json::to_value(&record).map_err(StoreError::from)?;
        self.store.insert(&self.config.record_table, &value).await?;

        advance(state, PipelineState::Done);
        Ok((record, processed_chunks))
    }

    async fn split(&self, source: SourceDocument) -> Result<ChunkSet> {
        let splitter =
            PageSplitter::new(self.config.chunk_pages).with_temp_root(self.config.temp_root());

        let chunks = tokio::task::spawn_blocking(move || splitter.split(&source))
            .await
            .map_err(|e| Error::Worker(e.to_string()))??;
        Ok(chunks)
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    tracing::debug!(from = %state, to = %next, "Pipeline state change");
    *state = next;
}

/// Processes `path` with settings read from the environment.
pub async fn process_document(path: impl AsRef<Path>) -> ProcessOutcome {
    process_with_settings(Settings::from_env(), path.as_ref()).await
}

/// Processes `path` with already loaded settings. A settings error is
/// reported as a configuration failure before any other work happens.
pub async fn process_with_settings(
    settings: std::result::Result<Settings, ConfigError>,
    path: &Path,
) -> ProcessOutcome {
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            let error = Error::from(e);
            tracing::error!(error_type = %error.kind(), "{}", error);
            return ProcessOutcome::failed(&error);
        }
    };

    match DocumentPipeline::from_settings(settings).await {
        Ok(pipeline) => pipeline.process(path).await,
        Err(e) => {
            tracing::error!(error_type = %e.kind(), "Failed to start pipeline: {}", e);
            ProcessOutcome::failed(&e)
        }
    }
}
