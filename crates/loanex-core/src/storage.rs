use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use thiserror::Error;
use uuid::Uuid;

use crate::settings::StoreConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    #[error("Record must be a JSON object")]
    NotAnObject,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Insert rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Store returned no record for insert into {0}")]
    EmptyResponse(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A generic keyed record store. Records are JSON objects; an `id` member,
/// when present, is used as the key.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts `record` into `table`, returning the record as stored.
    async fn insert(&self, table: &str, record: &Value) -> StoreResult<Value>;
}

/// Table names are interpolated into SQL and URLs, so only plain
/// identifiers are accepted.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn checked_table(name: &str) -> StoreResult<&str> {
    if is_valid_table_name(name) {
        Ok(name)
    } else {
        Err(StoreError::InvalidTable(name.to_string()))
    }
}

/// Opens the store described by `config`.
pub async fn open_store(
    config: &StoreConfig,
    timeout: Duration,
) -> StoreResult<Box<dyn RecordStore>> {
    match config {
        StoreConfig::Sqlite { path } => {
            let store = SqliteStore::open(&path.to_string_lossy()).await?;
            Ok(Box::new(store))
        }
        StoreConfig::Rest { url, key } => {
            let store = RestStore::new(url, key, timeout)?;
            Ok(Box::new(store))
        }
    }
}

pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn open(path: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{path}?mode=rwc"))
            .await?;

        Ok(Self { pool })
    }

    pub async fn open_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    async fn ensure_table(&self, table: &str) -> StoreResult<()> {
        let table = checked_table(table)?;
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{table}" (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn get(&self, table: &str, id: &str) -> StoreResult<Option<Value>> {
        self.ensure_table(table).await?;

        let sql = format!(r#"SELECT data FROM "{table}" WHERE id = ?"#);
        let row: Option<(String,)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(data,)| serde_json::from_str(&data).map_err(StoreError::from))
            .transpose()
    }

    pub async fn count(&self, table: &str) -> StoreResult<i64> {
        self.ensure_table(table).await?;

        let sql = format!(r#"SELECT COUNT(*) FROM "{table}""#);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl RecordStore for SqliteStore {
    async fn insert(&self, table: &str, record: &Value) -> StoreResult<Value> {
        if !record.is_object() {
            return Err(StoreError::NotAnObject);
        }
        self.ensure_table(table).await?;

        let id = record
            .get("id")
            .and_then(Value::as_str)
            .map_or_else(|| Uuid::now_v7().to_string(), String::from);
        let data = serde_json::to_string(record)?;

        let sql = format!(r#"INSERT INTO "{table}" (id, data, created_at) VALUES (?, ?, ?)"#);
        sqlx::query(&sql)
            .bind(&id)
            .bind(data)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        tracing::debug!(table, %id, "Inserted record");
        Ok(record.clone())
    }
}

/// Inserts through a PostgREST endpoint, as exposed by Supabase.
pub struct RestStore {
    client: Client,
    base_url: String,
    key: String,
}

impl RestStore {
    pub fn new(base_url: &str, key: &str, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> StoreResult<String> {
        let table = checked_table(table)?;
        Ok(format!("{}/rest/v1/{table}", self.base_url))
    }
}

#[async_trait::async_trait]
impl RecordStore for RestStore {
    async fn insert(&self, table: &str, record: &Value) -> StoreResult<Value> {
        if !record.is_object() {
            return Err(StoreError::NotAnObject);
        }
        let url = self.table_url(table)?;

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(record.clone());
        }

        match response.json::<Value>().await? {
            Value::Array(mut rows) if !rows.is_empty() => Ok(rows.swap_remove(0)),
            Value::Array(_) => Err(StoreError::EmptyResponse(table.to_string())),
            other => Ok(other),
        }
    }
}
