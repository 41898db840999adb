use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::storage::is_valid_table_name;

pub const API_KEY_VAR: &str = "ADDY_API_KEY";
pub const SUPABASE_URL_VAR: &str = "SUPABASE_URL";
pub const SUPABASE_KEY_VAR: &str = "SUPABASE_KEY";
pub const SQLITE_PATH_VAR: &str = "LOANEX_SQLITE_PATH";
pub const SERVICE_URL_VAR: &str = "LOANEX_SERVICE_URL";
pub const REQUEST_TIMEOUT_VAR: &str = "LOANEX_REQUEST_TIMEOUT_SECS";
pub const CHUNK_PAGES_VAR: &str = "LOANEX_CHUNK_PAGES";
pub const SPLIT_THRESHOLD_VAR: &str = "LOANEX_SPLIT_THRESHOLD_BYTES";
pub const MAX_CONCURRENT_VAR: &str = "LOANEX_MAX_CONCURRENT_CHUNKS";
pub const DEFAULT_TYPE_VAR: &str = "LOANEX_DEFAULT_DOCUMENT_TYPE";
pub const RECORD_TABLE_VAR: &str = "LOANEX_RECORD_TABLE";
pub const TEMP_DIR_VAR: &str = "LOANEX_TEMP_DIR";

/// Upper bound on concurrent chunk workers.
pub const MAX_CONCURRENT_CHUNKS: usize = 64;

pub const DEFAULT_SERVICE_URL: &str = "https://addy-ai-external-api-dev.firebaseapp.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Connection settings for the classification/extraction service
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Sent as the `api-key` header on every request
    #[serde(default, skip_serializing)]
    pub api_key: String,
    pub base_url: String,
    /// Applied to each classify and extract call separately
    pub request_timeout_seconds: u32,
    pub model_detail: String,
}

impl ServiceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout_seconds: 300,
            model_detail: "high".to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url(SERVICE_URL_VAR, &self.base_url)?;
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                REQUEST_TIMEOUT_VAR,
                "0",
                "timeout must be at least one second",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("model_detail", &self.model_detail)
            .finish()
    }
}

/// Where merged records are written
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// PostgREST endpoint (Supabase)
    Rest {
        url: String,
        #[serde(default, skip_serializing)]
        key: String,
    },
    /// Local SQLite database file
    Sqlite { path: PathBuf },
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Rest { url, .. } => validate_http_url(SUPABASE_URL_VAR, url),
            Self::Sqlite { .. } => Ok(()),
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rest { url, .. } => f
                .debug_struct("Rest")
                .field("url", url)
                .field("key", &"<redacted>")
                .finish(),
            Self::Sqlite { path } => f.debug_struct("Sqlite").field("path", path).finish(),
        }
    }
}

/// Tunables for splitting and dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum pages per chunk
    pub chunk_pages: usize,
    /// Documents larger than this many bytes are split
    pub split_threshold_bytes: u64,
    /// Width of the worker pool shared by all chunks of a document
    pub max_concurrent_chunks: usize,
    /// Used when classification fails
    pub default_document_type: String,
    pub record_table: String,
    /// Parent directory for per-invocation scratch directories
    pub temp_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_pages: 50,
            split_threshold_bytes: 10 * 1024 * 1024,
            max_concurrent_chunks: 3,
            default_document_type: "w2".to_string(),
            record_table: "extracted_documents".to_string(),
            temp_dir: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_pages == 0 {
            return Err(ConfigError::invalid(
                CHUNK_PAGES_VAR,
                "0",
                "chunks must hold at least one page",
            ));
        }
        if self.max_concurrent_chunks == 0 {
            return Err(ConfigError::invalid(
                MAX_CONCURRENT_VAR,
                "0",
                "at least one worker is required",
            ));
        }
        if self.max_concurrent_chunks > MAX_CONCURRENT_CHUNKS {
            return Err(ConfigError::invalid(
                MAX_CONCURRENT_VAR,
                self.max_concurrent_chunks.to_string(),
                format!("at most {MAX_CONCURRENT_CHUNKS} workers are allowed"),
            ));
        }
        if self.default_document_type.trim().is_empty() {
            return Err(ConfigError::invalid(
                DEFAULT_TYPE_VAR,
                self.default_document_type.clone(),
                "default document type must not be empty",
            ));
        }
        if !is_valid_table_name(&self.record_table) {
            return Err(ConfigError::invalid(
                RECORD_TABLE_VAR,
                self.record_table.clone(),
                "table names may only contain letters, digits and underscores",
            ));
        }
        Ok(())
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Everything a pipeline needs, loaded once and handed to its constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub service: ServiceConfig,
    pub store: StoreConfig,
    pub pipeline: PipelineConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable source. All missing
    /// required variables are reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut missing = Vec::new();

        let api_key = get(API_KEY_VAR);
        if api_key.is_none() {
            missing.push(API_KEY_VAR.to_string());
        }

        let store = if let Some(path) = get(SQLITE_PATH_VAR) {
            Some(StoreConfig::Sqlite { path: path.into() })
        } else {
            let url = get(SUPABASE_URL_VAR);
            let key = get(SUPABASE_KEY_VAR);
            if url.is_none() {
                missing.push(SUPABASE_URL_VAR.to_string());
            }
            if key.is_none() {
                missing.push(SUPABASE_KEY_VAR.to_string());
            }
            url.zip(key).map(|(url, key)| StoreConfig::Rest { url, key })
        };

        let (Some(api_key), Some(store)) = (api_key, store) else {
            return Err(ConfigError::Missing(missing));
        };

        let mut service = ServiceConfig::new(api_key);
        if let Some(url) = get(SERVICE_URL_VAR) {
            service.base_url = url;
        }
        if let Some(v) = get(REQUEST_TIMEOUT_VAR) {
            service.request_timeout_seconds = parse_var(REQUEST_TIMEOUT_VAR, &v)?;
        }

        let mut pipeline = PipelineConfig::default();
        if let Some(v) = get(CHUNK_PAGES_VAR) {
            pipeline.chunk_pages = parse_var(CHUNK_PAGES_VAR, &v)?;
        }
        if let Some(v) = get(SPLIT_THRESHOLD_VAR) {
            pipeline.split_threshold_bytes = parse_var(SPLIT_THRESHOLD_VAR, &v)?;
        }
        if let Some(v) = get(MAX_CONCURRENT_VAR) {
            pipeline.max_concurrent_chunks = parse_var(MAX_CONCURRENT_VAR, &v)?;
        }
        if let Some(v) = get(DEFAULT_TYPE_VAR) {
            pipeline.default_document_type = v;
        }
        if let Some(v) = get(RECORD_TABLE_VAR) {
            pipeline.record_table = v;
        }
        if let Some(v) = get(TEMP_DIR_VAR) {
            pipeline.temp_dir = Some(PathBuf::from(v));
        }

        let settings = Self {
            service,
            store,
            pipeline,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        self.store.validate()?;
        self.pipeline.validate()
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(name, value, e.to_string()))
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(value).map_err(|e| ConfigError::invalid(name, value, e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::invalid(
            name,
            value,
            format!("unsupported scheme {other}"),
        )),
    }
}
