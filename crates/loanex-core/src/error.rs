use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::{ExtractionError, SplitError};
use crate::settings::ConfigError;
use crate::storage::StoreError;

/// Every way processing a document can fail. Only classification failures
/// are absorbed before reaching this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("PDF file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Failed to persist extracted record: {0}")]
    Persistence(#[from] StoreError),

    /// The record store could not be opened; nothing was extracted yet.
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Worker failed: {0}")]
    Worker(String),
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::StoreUnavailable(_) | Self::HttpClient(_) => {
                ErrorKind::Configuration
            }
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::Io(_) => ErrorKind::Io,
            Self::Split(e) => e.kind(),
            Self::Extraction(e) => e.kind(),
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Worker(_) => ErrorKind::Worker,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Stable tag reported to callers as `error_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "ConfigurationError")]
    Configuration,
    #[serde(rename = "FileNotFoundError")]
    FileNotFound,
    #[serde(rename = "IoError")]
    Io,
    #[serde(rename = "DocumentFormatError")]
    DocumentFormat,
    #[serde(rename = "TransportError")]
    Transport,
    #[serde(rename = "ServiceError")]
    Service,
    #[serde(rename = "BadRequestError")]
    BadRequest,
    #[serde(rename = "AuthError")]
    Auth,
    #[serde(rename = "EndpointError")]
    Endpoint,
    #[serde(rename = "ExtractionFailedError")]
    ExtractionFailed,
    #[serde(rename = "PersistenceError")]
    Persistence,
    #[serde(rename = "WorkerError")]
    Worker,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::FileNotFound => "FileNotFoundError",
            Self::Io => "IoError",
            Self::DocumentFormat => "DocumentFormatError",
            Self::Transport => "TransportError",
            Self::Service => "ServiceError",
            Self::BadRequest => "BadRequestError",
            Self::Auth => "AuthError",
            Self::Endpoint => "EndpointError",
            Self::ExtractionFailed => "ExtractionFailedError",
            Self::Persistence => "PersistenceError",
            Self::Worker => "WorkerError",
        }
    }

    /// Connection-class failures point at misconfiguration rather than at
    /// the document.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Auth | Self::Endpoint | Self::Transport)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
