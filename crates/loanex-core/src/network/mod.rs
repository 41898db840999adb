mod client;
mod wire;

pub use client::ExtractionClient;
pub use wire::{
    ClassificationEntry, ClassificationHint, ClassifyRequest, ClassifyResponse, ExtractRequest,
    ExtractResponse, PDF_CONTENT_TYPE,
};

use serde_json::{Map, Value};

use crate::error::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Invalid API key. Please check your credentials: {0}")]
    Auth(String),
    #[error("Invalid API endpoint {0}. Please check the API documentation.")]
    Endpoint(String),
    #[error("API Error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Extraction failed: {0}")]
    Unsuccessful(String),
}

impl ServiceError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Endpoint(_) => ErrorKind::Endpoint,
            Self::Status { .. } => ErrorKind::Service,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Unsuccessful(_) => ErrorKind::ExtractionFailed,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// What the classification endpoint reported for a file.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// `None` when the service answered without naming a type
    pub document_type: Option<String>,
    pub confidence: Option<f64>,
}

/// The two operations offered by the remote document service.
#[async_trait::async_trait]
pub trait ExtractionService: Send + Sync {
    async fn classify(&self, file: &[u8]) -> ServiceResult<Classification>;

    /// Returns the raw, type-specific `document` object.
    async fn extract(&self, file: &[u8], document_type: &str) -> ServiceResult<Map<String, Value>>;
}
