use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::network::{Classification, ExtractionService, ServiceResult};
use crate::storage::{RecordStore, StoreError, StoreResult};

#[path = "../../tests/fixtures/pdf.rs"]
mod pdf;

pub use pdf::sample_pdf;

type ClassifyFn = dyn Fn(&[u8]) -> ServiceResult<Classification> + Send + Sync;
type ExtractFn = dyn Fn(&[u8], &str) -> ServiceResult<Map<String, Value>> + Send + Sync;

/// Scriptable in-process stand-in for the document service.
pub struct FakeService {
    classify: Box<ClassifyFn>,
    extract: Box<ExtractFn>,
    delay: Option<Duration>,
    classify_calls: AtomicUsize,
    extract_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            classify: Box::new(|_: &[u8]| {
                Ok(Classification {
                    document_type: Some("w2".into()),
                    confidence: Some(0.99),
                })
            }),
            extract: Box::new(|_: &[u8], _: &str| Ok(Map::new())),
            delay: None,
            classify_calls: AtomicUsize::new(0),
            extract_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn classify_as(self, document_type: &str) -> Self {
        let document_type = document_type.to_string();
        self.classify_with(move |_| {
            Ok(Classification {
                document_type: Some(document_type.clone()),
                confidence: Some(0.99),
            })
        })
    }

    pub fn classify_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8]) -> ServiceResult<Classification> + Send + Sync + 'static,
    {
        self.classify = Box::new(f);
        self
    }

    pub fn extract_document(self, document: Value) -> Self {
        let document = match document {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.extract_with(move |_, _| Ok(document.clone()))
    }

    pub fn extract_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8], &str) -> ServiceResult<Map<String, Value>> + Send + Sync + 'static,
    {
        self.extract = Box::new(f);
        self
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ExtractionService for FakeService {
    async fn classify(&self, file: &[u8]) -> ServiceResult<Classification> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        (self.classify)(file)
    }

    async fn extract(&self, file: &[u8], document_type: &str) -> ServiceResult<Map<String, Value>> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let result = (self.extract)(file, document_type);
        self.leave();
        result
    }
}

/// A store that rejects every insert.
pub struct FailingStore;

#[async_trait::async_trait]
impl RecordStore for FailingStore {
    async fn insert(&self, _table: &str, _record: &Value) -> StoreResult<Value> {
        Err(StoreError::Rejected {
            status: 503,
            body: "store unavailable".into(),
        })
    }
}
