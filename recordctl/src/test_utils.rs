//! Test utilities (available with the `test-utils` feature).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum_test::TestServer;

use crate::config::{Config, DatabaseConfig};
use crate::db::{
    errors::{DbError, Result},
    handlers::{InMemoryRecords, RecordFilter, RecordStore},
    models::records::RecordDBResponse,
};
use crate::query::SearchFilter;
use crate::types::RecordId;
use crate::Application;

const FIRST_NAMES: [&str; 6] = ["Jane", "John", "Alice", "Bob", "Carol", "Dmitri"];
const LAST_NAMES: [&str; 4] = ["Doe", "Smith", "Okafor", "Lindqvist"];

/// Records with ids `1..=n`. Every third record (ids divisible by 3) has a gmail address; the
/// rest use example.com. No other column contains "gmail".
pub fn sample_records(n: usize) -> Vec<RecordDBResponse> {
    (1..=n)
        .map(|i| RecordDBResponse {
            id: i as RecordId,
            first_name: FIRST_NAMES[i % FIRST_NAMES.len()].to_string(),
            last_name: LAST_NAMES[i % LAST_NAMES.len()].to_string(),
            email: if i % 3 == 0 {
                format!("user{i}@gmail.com")
            } else {
                format!("user{i}@example.com")
            },
            gender: if i % 2 == 0 { "Female" } else { "Male" }.to_string(),
            ip_address: format!("10.0.{}.{}", i / 256, i % 256),
        })
        .collect()
}

/// Configuration for tests: in-memory store, no rate limit surprises, no compression.
pub fn create_test_config() -> Config {
    let mut config = Config {
        database: DatabaseConfig::InMemory { seed_file: None },
        enable_compression: false,
        ..Default::default()
    };
    config.security.rate_limit.max_requests = 10_000;
    config
}

/// Test server over an in-memory store holding `records`.
pub fn create_test_app(records: Vec<RecordDBResponse>) -> TestServer {
    create_test_app_with_store(Arc::new(InMemoryRecords::new(records)))
}

pub fn create_test_app_with_store(store: Arc<dyn RecordStore>) -> TestServer {
    Application::with_store(create_test_config(), store, None)
        .expect("Failed to create application")
        .into_test_server()
}

/// A store whose every call fails as if the database were unreachable.
pub struct FailingStore;

impl FailingStore {
    fn error() -> DbError {
        DbError::Unavailable {
            message: "connection refused".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for FailingStore {
    async fn count(&self, _search: &SearchFilter) -> Result<u64> {
        Err(Self::error())
    }

    async fn fetch(&self, _filter: &RecordFilter) -> Result<Vec<RecordDBResponse>> {
        Err(Self::error())
    }

    async fn get_by_id(&self, _id: RecordId) -> Result<Option<RecordDBResponse>> {
        Err(Self::error())
    }
}

/// In-memory store that counts how many times it was queried.
pub struct CountingStore {
    inner: InMemoryRecords,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(records: Vec<RecordDBResponse>) -> Self {
        Self {
            inner: InMemoryRecords::new(records),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecordStore for CountingStore {
    async fn count(&self, search: &SearchFilter) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.count(search).await
    }

    async fn fetch(&self, filter: &RecordFilter) -> Result<Vec<RecordDBResponse>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(filter).await
    }

    async fn get_by_id(&self, id: RecordId) -> Result<Option<RecordDBResponse>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id).await
    }
}
