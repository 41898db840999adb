#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use lopdf::Document;
use serde_json::{json, Value};

#[path = "../fixtures/pdf.rs"]
mod pdf;

pub use pdf::sample_pdf;

pub const API_KEY: &str = "test-key";

pub fn write_pdf(dir: &Path, name: &str, pages: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, sample_pdf(pages)).unwrap();
    path
}

fn page_count(encoded: &str) -> usize {
    BASE64
        .decode(encoded)
        .ok()
        .and_then(|bytes| Document::load_mem(&bytes).ok())
        .map_or(0, |doc| doc.get_pages().len())
}

/// How the fake API answers classification for a chunk with a given page count.
#[derive(Clone, Copy)]
pub enum ClassifyRule {
    Always(&'static str),
    FailWhenPages(usize, &'static str),
}

pub struct ApiState {
    pub classify: ClassifyRule,
    pub extract_status: StatusCode,
    pub classify_calls: AtomicUsize,
    pub extract_calls: AtomicUsize,
    pub extracted_types: Mutex<Vec<String>>,
}

impl ApiState {
    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn extracted_types(&self) -> Vec<String> {
        let mut types = self.extracted_types.lock().unwrap().clone();
        types.sort();
        types
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("api-key").and_then(|v| v.to_str().ok()) == Some(API_KEY)
}

async fn classify(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.classify_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid api key"})));
    }

    let pages = body["fileData"][0].as_str().map_or(0, page_count);
    let document_type = match state.classify {
        ClassifyRule::Always(t) => t,
        ClassifyRule::FailWhenPages(n, _) if n == pages => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "model overloaded"})),
            );
        }
        ClassifyRule::FailWhenPages(_, t) => t,
    };

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "classifications": [{"documentType": document_type, "levelOfConfidence": 0.97}]
        })),
    )
}

async fn extract(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.extract_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid api key"})));
    }
    if state.extract_status != StatusCode::OK {
        return (state.extract_status, Json(json!({"error": "rejected"})));
    }

    let document_type = body["documentType"].as_str().unwrap_or_default().to_string();
    state.extracted_types.lock().unwrap().push(document_type.clone());

    let document = match document_type.as_str() {
        "w2" => json!({"wages": 75000, "employerName": "Acme Corp"}),
        "paystub" => json!({"grossPay": "5,000.00", "payPeriod": "monthly"}),
        _ => json!({"balance": 1234}),
    };

    (StatusCode::OK, Json(json!({"success": true, "document": document})))
}

pub struct FakeApi {
    pub addr: SocketAddr,
    pub state: Arc<ApiState>,
}

impl FakeApi {
    pub async fn start(rule: ClassifyRule) -> Self {
        Self::start_with(rule, StatusCode::OK).await
    }

    pub async fn start_with(rule: ClassifyRule, extract_status: StatusCode) -> Self {
        let state = Arc::new(ApiState {
            classify: rule,
            extract_status,
            classify_calls: AtomicUsize::new(0),
            extract_calls: AtomicUsize::new(0),
            extracted_types: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/document/classify", post(classify))
            .route("/document/extract", post(extract))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}
