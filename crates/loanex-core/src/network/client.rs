use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use super::wire::{
    ClassificationHint, ClassifyRequest, ClassifyResponse, ExtractRequest, ExtractResponse,
    PDF_CONTENT_TYPE,
};
use super::{Classification, ExtractionService, ServiceError, ServiceResult};
use crate::settings::{ConfigError, ServiceConfig, SERVICE_URL_VAR};

const CLASSIFY_PATH: &str = "document/classify";
const EXTRACT_PATH: &str = "document/extract";

/// HTTP client for the document classification/extraction API.
///
/// Each call carries the configured request timeout. Nothing is retried;
/// every failure is reported with its own [`ServiceError`] variant.
pub struct ExtractionClient {
    config: ServiceConfig,
    inner: Client,
    classify_url: Url,
    extract_url: Url,
}

impl ExtractionClient {
    pub fn new(config: ServiceConfig) -> crate::Result<Self> {
        let classify_url = endpoint(&config.base_url, CLASSIFY_PATH)?;
        let extract_url = endpoint(&config.base_url, EXTRACT_PATH)?;

        let inner = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .build()
            .map_err(|e| crate::Error::HttpClient(e.to_string()))?;

        Ok(Self {
            config,
            inner,
            classify_url,
            extract_url,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    async fn post<B, R>(&self, url: &Url, body: &B) -> ServiceResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .inner
            .post(url.clone())
            .header("api-key", &self.config.api_key)
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %text, "API request to {} failed", url);
            return Err(status_error(status, text, url));
        }

        serde_json::from_str(&text)
            .map_err(|e| ServiceError::Unsuccessful(format!("Failed to parse API response: {e}")))
    }
}

#[async_trait::async_trait]
impl ExtractionService for ExtractionClient {
    async fn classify(&self, file: &[u8]) -> ServiceResult<Classification> {
        let encoded = BASE64.encode(file);
        let request = ClassifyRequest {
            file_data: vec![encoded.as_str()],
            content_type: PDF_CONTENT_TYPE,
            model_detail: &self.config.model_detail,
        };

        let response: ClassifyResponse = self.post(&self.classify_url, &request).await?;

        if !response.success {
            return Err(ServiceError::Unsuccessful(format!(
                "Classification failed: {}",
                response.reason.as_deref().unwrap_or("Unknown error")
            )));
        }

        let first = response
            .classifications
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Unsuccessful("No document classification found".into()))?;

        Ok(Classification {
            document_type: first.document_type,
            confidence: first.level_of_confidence,
        })
    }

    async fn extract(&self, file: &[u8], document_type: &str) -> ServiceResult<Map<String, Value>> {
        let encoded = BASE64.encode(file);
        let request = ExtractRequest {
            file_data: &encoded,
            content_type: PDF_CONTENT_TYPE,
            document_type,
            classification: ClassificationHint {
                document_type,
                level_of_confidence: 1.0,
            },
        };

        let response: ExtractResponse = self.post(&self.extract_url, &request).await?;

        if !response.success {
            return Err(ServiceError::Unsuccessful(format!(
                "API returned error: {}",
                response.error_message.as_deref().unwrap_or("Unknown error")
            )));
        }

        Ok(response.document.unwrap_or_default())
    }
}

fn endpoint(base_url: &str, path: &str) -> Result<Url, ConfigError> {
    let raw = format!("{}/{path}", base_url.trim_end_matches('/'));
    Url::parse(&raw).map_err(|e| ConfigError::Invalid {
        name: SERVICE_URL_VAR.to_string(),
        value: base_url.to_string(),
        reason: e.to_string(),
    })
}

fn status_error(status: StatusCode, body: String, url: &Url) -> ServiceError {
    match status {
        StatusCode::BAD_REQUEST => ServiceError::BadRequest(body),
        StatusCode::UNAUTHORIZED => ServiceError::Auth(body),
        StatusCode::NOT_FOUND => ServiceError::Endpoint(url.to_string()),
        other => ServiceError::Status {
            status: other.as_u16(),
            body,
        },
    }
}
