use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use super::classifier::ChunkClassifier;
use super::document::{DocumentChunk, PageRange};
use super::extractor::{ChunkExtractor, ExtractionError};
use crate::record::ExtractedFields;

/// Result of classifying and extracting one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkExtraction {
    pub index: usize,
    pub pages: Option<PageRange>,
    pub document_type: String,
    pub fields: ExtractedFields,
}

/// Runs chunk workers with bounded concurrency.
///
/// The first failing chunk fails the whole run. Workers that have not yet
/// started are never dispatched, and `run` waits for in-flight workers to
/// finish before returning so chunk files can be released deterministically.
pub struct ChunkScheduler {
    classifier: ChunkClassifier,
    extractor: ChunkExtractor,
    max_concurrent: usize,
    completed: Arc<AtomicUsize>,
}

impl ChunkScheduler {
    pub fn new(classifier: ChunkClassifier, extractor: ChunkExtractor, max_concurrent: usize) -> Self {
        Self {
            classifier,
            extractor,
            max_concurrent: max_concurrent.clamp(1, Semaphore::MAX_PERMITS),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Shared counter of successfully completed chunks.
    pub fn progress(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.completed)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Extracts every chunk. Results are returned in completion order.
    pub async fn run(
        &self,
        chunks: &[Arc<DocumentChunk>],
    ) -> Result<Vec<ChunkExtraction>, ExtractionError> {
        let total = chunks.len();
        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let mut workers = JoinSet::new();

        for chunk in chunks {
            let chunk = Arc::clone(chunk);
            let classifier = self.classifier.clone();
            let extractor = self.extractor.clone();
            let permits = Arc::clone(&permits);
            let span = tracing::info_span!("chunk", index = chunk.index());

            workers.spawn(
                async move {
                    // A closed semaphore means another chunk already failed.
                    let Ok(_permit) = Arc::clone(&permits).acquire_owned().await else {
                        return None;
                    };
                    let outcome = process_chunk(&classifier, &extractor, &chunk).await;
                    if outcome.is_err() {
                        permits.close();
                    }
                    Some(outcome)
                }
                .instrument(span),
            );
        }

        let mut results = Vec::with_capacity(total);
        let mut failure: Option<ExtractionError> = None;

        while let Some(joined) = workers.join_next().await {
            let outcome = match joined {
                Ok(Some(outcome)) => outcome,
                Ok(None) => continue,
                Err(e) => {
                    permits.close();
                    Err(ExtractionError::Worker(e.to_string()))
                }
            };

            if failure.is_some() {
                continue;
            }

            match outcome {
                Ok(extraction) => {
                    let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
                    tracing::info!(
                        "Processed chunk {}/{} ({})",
                        done,
                        total,
                        extraction.document_type
                    );
                    results.push(extraction);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Chunk failed, cancelling remaining chunks");
                    failure = Some(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}

async fn process_chunk(
    classifier: &ChunkClassifier,
    extractor: &ChunkExtractor,
    chunk: &DocumentChunk,
) -> Result<ChunkExtraction, ExtractionError> {
    let bytes = chunk.load().await.map_err(|source| ExtractionError::ReadChunk {
        index: chunk.index(),
        source,
    })?;

    let document_type = classifier.classify(&bytes).await;
    let fields = extractor.extract(&bytes, &document_type).await?;

    Ok(ChunkExtraction {
        index: chunk.index(),
        pages: chunk.pages(),
        document_type,
        fields,
    })
}
