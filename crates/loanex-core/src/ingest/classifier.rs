use std::sync::Arc;

use crate::network::{Classification, ExtractionService};

/// Picks a document type for each chunk.
///
/// Classification never fails a chunk: any service error, or an answer
/// without a type, falls back to the configured default.
#[derive(Clone)]
pub struct ChunkClassifier {
    service: Arc<dyn ExtractionService>,
    default_type: String,
}

impl ChunkClassifier {
    pub fn new(service: Arc<dyn ExtractionService>, default_type: impl Into<String>) -> Self {
        Self {
            service,
            default_type: default_type.into(),
        }
    }

    pub fn default_type(&self) -> &str {
        &self.default_type
    }

    pub async fn classify(&self, chunk: &[u8]) -> String {
        match self.service.classify(chunk).await {
            Ok(Classification {
                document_type: Some(document_type),
                confidence,
            }) if !document_type.trim().is_empty() => {
                tracing::info!(?confidence, "Document classified as {}", document_type);
                document_type
            }
            Ok(_) => {
                tracing::warn!(
                    "Classification returned no document type, using default: {}",
                    self.default_type
                );
                self.default_type.clone()
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Classification failed, using default type: {}",
                    self.default_type
                );
                self.default_type.clone()
            }
        }
    }
}
