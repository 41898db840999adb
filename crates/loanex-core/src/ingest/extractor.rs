use std::fmt;
use std::io;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ErrorKind;
use crate::network::{ExtractionService, ServiceError};
use crate::record::ExtractedFields;

/// Paystub gross pay is reported per month.
const PAY_PERIODS_PER_YEAR: f64 = 12.0;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Failed to parse API response: field {field} {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Failed to read chunk {index}: {source}")]
    ReadChunk {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("Chunk worker failed: {0}")]
    Worker(String),
}

impl ExtractionError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Service(e) => e.kind(),
            Self::InvalidField { .. } => ErrorKind::ExtractionFailed,
            Self::ReadChunk { .. } => ErrorKind::Io,
            Self::Worker(_) => ErrorKind::Worker,
        }
    }

    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Document types with a known field mapping. Anything else maps to zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentType {
    W2,
    Paystub,
    Other(String),
}

impl DocumentType {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "w2" | "w-2" => Self::W2,
            "paystub" | "paystubs" => Self::Paystub,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::W2 => "w2",
            Self::Paystub => "paystub",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DocumentType {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Maps a type-specific `document` object onto the common fields.
pub fn map_fields(
    document_type: &DocumentType,
    document: &Map<String, Value>,
) -> Result<ExtractedFields, ExtractionError> {
    let fields = match document_type {
        DocumentType::W2 => ExtractedFields::zero().with_income(amount(document, "wages")?),
        DocumentType::Paystub => ExtractedFields::zero()
            .with_income(amount(document, "grossPay")? * PAY_PERIODS_PER_YEAR),
        DocumentType::Other(name) => {
            tracing::debug!("No field mapping for document type {}", name);
            ExtractedFields::zero()
        }
    };
    Ok(fields)
}

/// Reads a non-negative amount. Missing and null read as zero; strings may
/// carry currency symbols and thousands separators.
fn amount(document: &Map<String, Value>, field: &str) -> Result<f64, ExtractionError> {
    let value = match document.get(field) {
        None | Some(Value::Null) => return Ok(0.0),
        Some(value) => value,
    };

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Some(v) => Err(ExtractionError::invalid(
            field,
            format!("must be a non-negative amount, got {v}"),
        )),
        None => Err(ExtractionError::invalid(
            field,
            format!("is not numeric: {value}"),
        )),
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '$') && !c.is_whitespace())
        .collect();
    cleaned.parse().ok()
}

/// Runs type-specific extraction for one chunk.
#[derive(Clone)]
pub struct ChunkExtractor {
    service: Arc<dyn ExtractionService>,
}

impl ChunkExtractor {
    pub fn new(service: Arc<dyn ExtractionService>) -> Self {
        Self { service }
    }

    pub async fn extract(
        &self,
        chunk: &[u8],
        document_type: &str,
    ) -> Result<ExtractedFields, ExtractionError> {
        let document = self.service.extract(chunk, document_type).await?;
        let fields = map_fields(&DocumentType::parse(document_type), &document)?;
        tracing::debug!(
            income = fields.income,
            "Extracted {} fields",
            document_type
        );
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::testing::FakeService;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_document_type_parse() {
        assert_eq!(DocumentType::parse("W2"), DocumentType::W2);
        assert_eq!(DocumentType::parse("w-2"), DocumentType::W2);
        assert_eq!(DocumentType::parse(" Paystubs "), DocumentType::Paystub);
        assert_eq!(
            DocumentType::parse("bank_statement"),
            DocumentType::Other("bank_statement".into())
        );
        assert_eq!(DocumentType::from("paystub").to_string(), "paystub");
    }

    #[test]
    fn test_w2_wages_become_income() {
        let fields = map_fields(&DocumentType::W2, &object(json!({"wages": 75000}))).unwrap();

        assert!((fields.income - 75000.0).abs() < f64::EPSILON);
        assert_eq!(fields.credit_score, 0);
        assert!(fields.debt.abs() < f64::EPSILON);
        assert!(fields.property_value.abs() < f64::EPSILON);
    }

    #[test]
    fn test_paystub_gross_pay_is_annualized() {
        let fields =
            map_fields(&DocumentType::Paystub, &object(json!({"grossPay": 5000}))).unwrap();
        assert!((fields.income - 60000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let fields =
            map_fields(&DocumentType::W2, &object(json!({"wages": "$75,000.50"}))).unwrap();
        assert!((fields.income - 75000.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_or_null_reads_as_zero() {
        for document in [json!({}), json!({"wages": null})] {
            let fields = map_fields(&DocumentType::W2, &object(document)).unwrap();
            assert!(fields.is_zero());
        }
    }

    #[test]
    fn test_unknown_type_maps_to_zero() {
        let fields = map_fields(
            &DocumentType::Other("1099".into()),
            &object(json!({"wages": 1_000_000})),
        )
        .unwrap();
        assert!(fields.is_zero());
    }

    #[test]
    fn test_rejects_invalid_amounts() {
        for wages in [json!(-1), json!("abc"), json!(true), json!([1]), json!("NaN"), json!("")] {
            let err = map_fields(&DocumentType::W2, &object(json!({"wages": wages}))).unwrap_err();

            assert!(matches!(err, ExtractionError::InvalidField { ref field, .. } if field == "wages"));
            assert_eq!(err.kind(), ErrorKind::ExtractionFailed);
        }
    }

    #[tokio::test]
    async fn test_extractor_propagates_service_errors() {
        let service = FakeService::new()
            .extract_with(|_, _| Err(ServiceError::Auth("bad key".into())));
        let extractor = ChunkExtractor::new(Arc::new(service));

        let err = extractor.extract(b"pdf", "w2").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_extractor_maps_response() {
        let service = FakeService::new().extract_document(json!({"grossPay": "4,000"}));
        let extractor = ChunkExtractor::new(Arc::new(service));

        let fields = extractor.extract(b"pdf", "paystub").await.unwrap();
        assert!((fields.income - 48000.0).abs() < f64::EPSILON);
    }
}
