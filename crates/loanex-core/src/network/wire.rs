use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest<'a> {
    pub file_data: Vec<&'a str>,
    pub content_type: &'a str,
    pub model_detail: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub classifications: Vec<ClassificationEntry>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationEntry {
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub level_of_confidence: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest<'a> {
    pub file_data: &'a str,
    pub content_type: &'a str,
    pub document_type: &'a str,
    pub classification: ClassificationHint<'a>,
}

/// Echoes the chosen type back so the service skips its own classification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationHint<'a> {
    pub document_type: &'a str,
    pub level_of_confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub document: Option<Map<String, Value>>,
    #[serde(default)]
    pub error_message: Option<String>,
}
