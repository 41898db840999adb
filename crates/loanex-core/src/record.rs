use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The canonical numeric fields every document type is mapped onto.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub income: f64,
    pub credit_score: u32,
    pub debt: f64,
    pub property_value: f64,
}

impl ExtractedFields {
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            income: 0.0,
            credit_score: 0,
            debt: 0.0,
            property_value: 0.0,
        }
    }

    #[must_use]
    pub const fn with_income(mut self, income: f64) -> Self {
        self.income = income;
        self
    }

    #[must_use]
    pub const fn with_credit_score(mut self, credit_score: u32) -> Self {
        self.credit_score = credit_score;
        self
    }

    #[must_use]
    pub const fn with_debt(mut self, debt: f64) -> Self {
        self.debt = debt;
        self
    }

    #[must_use]
    pub const fn with_property_value(mut self, property_value: f64) -> Self {
        self.property_value = property_value;
        self
    }

    /// Field-wise maximum of `self` and `other`.
    #[must_use]
    pub fn max_with(self, other: &Self) -> Self {
        Self {
            income: self.income.max(other.income),
            credit_score: self.credit_score.max(other.credit_score),
            debt: self.debt.max(other.debt),
            property_value: self.property_value.max(other.property_value),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

/// The unit persisted for one processed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: ExtractedFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub chunk_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document_types: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl MergedRecord {
    #[must_use]
    pub fn new(fields: ExtractedFields, chunk_count: usize) -> Self {
        Self {
            id: Uuid::now_v7(),
            fields,
            source_file: None,
            chunk_count,
            document_types: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_source_file(mut self, name: impl Into<String>) -> Self {
        self.source_file = Some(name.into());
        self
    }

    /// Records the distinct document types seen across chunks, sorted.
    #[must_use]
    pub fn with_document_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut types: Vec<String> = types.into_iter().map(Into::into).collect();
        types.sort();
        types.dedup();
        self.document_types = types;
        self
    }
}
